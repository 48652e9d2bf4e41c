//! Transport primitives for instance API calls.
//!
//! The module exposes [`ApiHttpClient`] alongside [`RawResponse`] and [`ResponseBody`] so
//! downstream crates can integrate custom HTTP clients. A transport resolves as soon as the
//! status line and headers are available and hands back the body as a one-shot handle; the
//! connection layer decides whether that handle is read (and decoded) or released unread.

// std
#[cfg(feature = "reqwest")] use std::{ops::Deref, time::Duration as StdDuration};
// crates.io
use oauth2::http::{HeaderMap, StatusCode, header::RETRY_AFTER};
use time::format_description::well_known::Rfc2822;
// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")] use crate::error::{ConfigError, TransportError};

/// Outbound request handed to an [`ApiHttpClient`].
pub type HttpRequest = oauth2::HttpRequest;

/// Future returned by [`ApiHttpClient::execute`].
pub type HttpFuture<'a> = Pin<Box<dyn Future<Output = Result<RawResponse>> + 'a + Send>>;

/// Future returned by [`ResponseBody::read_to_end`].
pub type BodyFuture =
	Pin<Box<dyn Future<Output = Result<Vec<u8>, crate::error::TransportError>> + Send>>;

/// Abstraction over HTTP transports capable of issuing instance API requests.
///
/// The trait is the client's only dependency on an HTTP stack. Implementations must be
/// `Send + Sync + 'static` so one transport can back any number of connections, and the
/// futures they return must be `Send`. Network-level failures (DNS, refused connections,
/// timeouts) surface as [`crate::error::TransportError`]; implementations must not retry.
pub trait ApiHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves once the response head is available.
	fn execute(&self, request: HttpRequest) -> HttpFuture<'_>;
}

/// Single-use handle over a response body that has not been read yet.
///
/// Ownership of the handle is the duty to release the underlying connection resource.
/// Reading consumes the handle; dropping it (directly or through [`ResponseBody::discard`])
/// releases the resource without reading a byte.
pub trait ResponseBody
where
	Self: Send,
{
	/// Reads the complete body, releasing the handle once the read finishes or fails.
	fn read_to_end(self: Box<Self>) -> BodyFuture;

	/// Releases the handle without reading the body.
	fn discard(self: Box<Self>) {}
}

/// Response head plus the unread body handle returned by a transport.
pub struct RawResponse {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Body handle; read at most once.
	pub body: Box<dyn ResponseBody>,
}
impl RawResponse {
	/// Bundles a response head with its body handle.
	pub fn new(status: StatusCode, headers: HeaderMap, body: impl 'static + ResponseBody) -> Self {
		Self { status, headers, body: Box::new(body) }
	}

	/// Parses the `Retry-After` header, if present.
	pub fn retry_after(&self) -> Option<Duration> {
		parse_retry_after(&self.headers)
	}
}
impl Debug for RawResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RawResponse")
			.field("status", &self.status)
			.field("headers", &self.headers)
			.finish_non_exhaustive()
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Request timeout applied by [`ReqwestHttpClient::new`].
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(30);
	/// User agent sent by clients built through [`ReqwestHttpClient::with_timeout`].
	pub const USER_AGENT: &'static str = concat!("mastodon-connect/", env!("CARGO_PKG_VERSION"));

	/// Builds the default transport, bounded by [`ReqwestHttpClient::DEFAULT_TIMEOUT`].
	pub fn new() -> Result<Self> {
		Self::with_timeout(Self::DEFAULT_TIMEOUT)
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client whose requests fail with a timeout error after `timeout`.
	pub fn with_timeout(timeout: StdDuration) -> Result<Self> {
		let client = ReqwestClient::builder()
			.timeout(timeout)
			.user_agent(Self::USER_AGENT)
			.build()
			.map_err(ConfigError::from)?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiHttpClient for ReqwestHttpClient {
	fn execute(&self, request: HttpRequest) -> HttpFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let request = reqwest::Request::try_from(request).map_err(ConfigError::from)?;
			let response = client.execute(request).await.map_err(TransportError::from)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			Ok(RawResponse::new(status, headers, ReqwestBody(response)))
		})
	}
}

/// Body handle backed by a live [`reqwest::Response`].
#[cfg(feature = "reqwest")]
struct ReqwestBody(reqwest::Response);
#[cfg(feature = "reqwest")]
impl ResponseBody for ReqwestBody {
	fn read_to_end(self: Box<Self>) -> BodyFuture {
		Box::pin(async move {
			let bytes = self.0.bytes().await.map_err(TransportError::from)?;

			Ok(bytes.to_vec())
		})
	}
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::HeaderValue;
	// self
	use super::*;

	fn headers_with_retry_after(value: &str) -> HeaderMap {
		let mut headers = HeaderMap::new();

		headers.insert(
			RETRY_AFTER,
			HeaderValue::from_str(value).expect("Retry-After fixture should be a valid header."),
		);

		headers
	}

	#[test]
	fn retry_after_accepts_delta_seconds() {
		let headers = headers_with_retry_after("120");

		assert_eq!(parse_retry_after(&headers), Some(Duration::seconds(120)));
	}

	#[test]
	fn retry_after_ignores_past_dates_and_garbage() {
		assert_eq!(parse_retry_after(&headers_with_retry_after("Wed, 21 Oct 2015 07:28:00 GMT")), None);
		assert_eq!(parse_retry_after(&headers_with_retry_after("soon")), None);
		assert_eq!(parse_retry_after(&HeaderMap::new()), None);
	}
}
