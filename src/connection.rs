//! Authenticated request plumbing against a single instance.
//!
//! [`ApiConnection`] owns the transport handle, the instance base address, and an optional
//! bearer token. Reads go through [`ApiConnection::get`], which decodes immediately; writes go
//! through [`ApiConnection::post_lazy`], which hands back a [`DeferredResponse`] so the caller
//! decides whether the body is worth decoding. Non-success responses never reach the caller as
//! a deferred body: they are read, released, and classified first (see [`classify`]).
//!
//! Neither call retries. Dropping either future releases whatever the transport had acquired.

pub mod classify;

// crates.io
use oauth2::http::{
	Method, Request,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue},
};
use url::form_urlencoded::Serializer;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	deferred::DeferredResponse,
	error::ConfigError,
	http::{ApiHttpClient, HttpRequest, RawResponse},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

const JSON: &str = "application/json";
const FORM: &str = "application/x-www-form-urlencoded";

/// Ordered request parameters for query strings and form bodies.
///
/// Keys are fixed wire names. Optional values added through [`Params::with_opt`] are omitted
/// entirely when absent rather than sent empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params(Vec<(&'static str, String)>);
impl Params {
	/// Creates an empty parameter list.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a parameter.
	pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
		self.0.push((key, value.into()));

		self
	}

	/// Appends a parameter only when a value is present.
	pub fn with_opt<V>(self, key: &'static str, value: Option<V>) -> Self
	where
		V: Into<String>,
	{
		match value {
			Some(value) => self.with(key, value),
			None => self,
		}
	}

	/// Returns the first value recorded for `key`.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.0.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
	}

	/// Number of parameters.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true when no parameters are set.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterates parameters in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
		self.0.iter().map(|(k, v)| (*k, v.as_str()))
	}

	/// Encodes the parameters as `application/x-www-form-urlencoded`.
	pub fn encode(&self) -> String {
		Serializer::new(String::new()).extend_pairs(self.iter()).finish()
	}
}

/// Request channel bound to one instance and, optionally, one bearer token.
pub struct ApiConnection<C>
where
	C: ?Sized + ApiHttpClient,
{
	http_client: Arc<C>,
	instance: Url,
	access_token: Option<TokenSecret>,
}
impl<C> ApiConnection<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates an unauthenticated connection that reuses the caller-provided transport.
	pub fn with_http_client(instance: Url, http_client: impl Into<Arc<C>>) -> Self {
		Self { http_client: http_client.into(), instance, access_token: None }
	}

	/// Attaches a bearer token to every subsequent request.
	pub fn with_access_token(mut self, token: TokenSecret) -> Self {
		self.access_token = Some(token);

		self
	}

	/// Instance base address.
	pub fn instance(&self) -> &Url {
		&self.instance
	}

	/// Shared transport handle.
	pub fn http_client(&self) -> &Arc<C> {
		&self.http_client
	}

	/// Returns true when requests carry an `Authorization` header.
	pub fn has_access_token(&self) -> bool {
		self.access_token.is_some()
	}

	/// Issues a GET request and decodes the JSON result immediately.
	pub async fn get<T>(&self, path: &str, query: &Params) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let request = self.build(Method::GET, path, query)?;
		let response = self.send(request).await?;

		DeferredResponse::new(response).into_value().await
	}

	/// Issues a form-encoded POST request and returns the body undecoded.
	pub async fn post_lazy<T>(&self, path: &str, form: &Params) -> Result<DeferredResponse<T>>
	where
		T: DeserializeOwned,
	{
		let request = self.build(Method::POST, path, form)?;
		let response = self.send(request).await?;

		Ok(DeferredResponse::new(response))
	}

	/// Resolves `path` against the instance base address.
	pub fn endpoint(&self, path: &str) -> Result<Url> {
		self.instance
			.join(path)
			.map_err(|e| ConfigError::invalid_instance(self.instance.as_str(), Some(e)).into())
	}

	fn build(&self, method: Method, path: &str, params: &Params) -> Result<HttpRequest> {
		let mut url = self.endpoint(path)?;
		let mut builder = Request::builder().header(ACCEPT, HeaderValue::from_static(JSON));

		if let Some(token) = &self.access_token {
			builder = builder.header(AUTHORIZATION, token.bearer());
		}

		let body = if method == Method::POST {
			builder = builder.header(CONTENT_TYPE, HeaderValue::from_static(FORM));

			params.encode().into_bytes()
		} else {
			if !params.is_empty() {
				url.query_pairs_mut().extend_pairs(params.iter());
			}

			Vec::new()
		};
		let request =
			builder.method(method).uri(url.as_str()).body(body).map_err(ConfigError::from)?;

		Ok(request)
	}

	async fn send(&self, request: HttpRequest) -> Result<RawResponse> {
		let response = self.http_client.execute(request).await?;

		if response.status.is_success() {
			Ok(response)
		} else {
			Err(classify::reject(response).await)
		}
	}
}
#[cfg(feature = "reqwest")]
impl ApiConnection<ReqwestHttpClient> {
	/// Creates an unauthenticated connection backed by the default reqwest transport.
	pub fn new(instance: Url) -> Result<Self> {
		Ok(Self::with_http_client(instance, ReqwestHttpClient::new()?))
	}
}
impl<C> Clone for ApiConnection<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			instance: self.instance.clone(),
			access_token: self.access_token.clone(),
		}
	}
}
impl<C> Debug for ApiConnection<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiConnection")
			.field("instance", &self.instance.as_str())
			.field("access_token", &self.access_token)
			.finish()
	}
}
