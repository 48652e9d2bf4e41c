//! Deferred JSON responses that own their body until it is decoded or discarded.
//!
//! A [`DeferredResponse`] exists only after the network call has completed; the remaining
//! decision is whether to pay for reading and decoding the body. Exactly one of three things
//! happens to the body handle, whichever comes first:
//!
//! - [`DeferredResponse::materialize`] reads it once and caches the decoded value (or the decode
//!   failure).
//! - [`DeferredResponse::discard`] releases it unread.
//! - The response is dropped (scope exit or a cancelled future), which also releases it unread.

// std
use std::mem;
// crates.io
use oauth2::http::{HeaderMap, StatusCode};
// self
use crate::{
	_prelude::*,
	error::{PayloadError, TransportError},
	http::{RawResponse, ResponseBody},
};

enum BodyState<T> {
	Unconsumed(Box<dyn ResponseBody>),
	Decoded(T),
	Malformed(PayloadError),
	Unreadable(String),
	Discarded,
}

/// Completed response whose JSON body is decoded into `T` only on demand.
pub struct DeferredResponse<T> {
	status: StatusCode,
	headers: HeaderMap,
	state: BodyState<T>,
}
impl<T> DeferredResponse<T>
where
	T: DeserializeOwned,
{
	/// Takes exclusive ownership of a transport response.
	pub fn new(response: RawResponse) -> Self {
		let RawResponse { status, headers, body } = response;

		Self { status, headers, state: BodyState::Unconsumed(body) }
	}

	/// HTTP status of the response.
	pub fn status(&self) -> StatusCode {
		self.status
	}

	/// Response headers.
	pub fn headers(&self) -> &HeaderMap {
		&self.headers
	}

	/// Returns `true` once the body handle has been read, discarded, or failed.
	pub fn is_consumed(&self) -> bool {
		!matches!(self.state, BodyState::Unconsumed(_))
	}

	/// Reads and decodes the body on first call; later calls replay the first outcome.
	///
	/// The body handle is released when this call finishes, whether decoding succeeded or not.
	/// A decode failure is replayed as the same [`PayloadError`]. A read failure is reported
	/// once with its source and afterwards as [`TransportError::BodyUnavailable`].
	///
	/// Materializing after [`discard`](Self::discard) is a caller error and fails with
	/// [`Error::ResponseDiscarded`].
	pub async fn materialize(&mut self) -> Result<&T> {
		if let Some(body) = self.take_body() {
			match body.read_to_end().await {
				Ok(bytes) =>
					self.state = match decode::<T>(&bytes, self.status) {
						Ok(value) => BodyState::Decoded(value),
						Err(e) => BodyState::Malformed(e),
					},
				Err(e) => {
					self.state = BodyState::Unreadable(e.to_string());

					return Err(e.into());
				},
			}
		}

		match &self.state {
			BodyState::Decoded(value) => Ok(value),
			BodyState::Malformed(e) => Err(e.clone().into()),
			BodyState::Unreadable(message) =>
				Err(TransportError::BodyUnavailable { message: message.clone() }.into()),
			BodyState::Unconsumed(_) | BodyState::Discarded => Err(Error::ResponseDiscarded),
		}
	}

	/// Materializes the body and hands back ownership of the decoded value.
	pub async fn into_value(mut self) -> Result<T> {
		self.materialize().await?;

		match mem::replace(&mut self.state, BodyState::Discarded) {
			BodyState::Decoded(value) => Ok(value),
			_ => Err(Error::ResponseDiscarded),
		}
	}

	/// Releases the body handle without reading it.
	///
	/// Idempotent: calling it again, or after [`materialize`](Self::materialize), is a no-op
	/// and keeps any cached outcome.
	pub fn discard(&mut self) {
		if let Some(body) = self.take_body() {
			body.discard();
		}
	}

	fn take_body(&mut self) -> Option<Box<dyn ResponseBody>> {
		match mem::replace(&mut self.state, BodyState::Discarded) {
			BodyState::Unconsumed(body) => Some(body),
			other => {
				self.state = other;

				None
			},
		}
	}
}
impl<T> Debug for DeferredResponse<T> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = match self.state {
			BodyState::Unconsumed(_) => "unconsumed",
			BodyState::Decoded(_) => "decoded",
			BodyState::Malformed(_) => "malformed",
			BodyState::Unreadable(_) => "unreadable",
			BodyState::Discarded => "discarded",
		};

		f.debug_struct("DeferredResponse")
			.field("status", &self.status)
			.field("state", &state)
			.finish()
	}
}

/// Extension for futures that produce a [`DeferredResponse`] the caller does not need.
pub trait IgnoreResponse<T>
where
	Self: Sized + Future<Output = Result<DeferredResponse<T>>>,
	T: DeserializeOwned,
{
	/// Awaits the call and discards its body unread, keeping only success or failure.
	fn ignore_response(self) -> impl Future<Output = Result<()>> {
		async move {
			let mut response = self.await?;

			response.discard();

			Ok(())
		}
	}
}
impl<F, T> IgnoreResponse<T> for F
where
	F: Future<Output = Result<DeferredResponse<T>>>,
	T: DeserializeOwned,
{
}

fn decode<T>(bytes: &[u8], status: StatusCode) -> Result<T, PayloadError>
where
	T: DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_slice(bytes);

	serde_path_to_error::deserialize(&mut de).map_err(|e| PayloadError::new(e, status.as_u16()))
}

#[cfg(test)]
pub(crate) mod tests {
	// std
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::http::BodyFuture;

	/// Body double that records reads and releases.
	#[derive(Clone, Default)]
	pub(crate) struct Probe {
		pub(crate) reads: Arc<AtomicUsize>,
		pub(crate) released: Arc<AtomicBool>,
	}
	impl Probe {
		pub(crate) fn reads(&self) -> usize {
			self.reads.load(Ordering::SeqCst)
		}

		pub(crate) fn released(&self) -> bool {
			self.released.load(Ordering::SeqCst)
		}
	}

	pub(crate) struct ProbeBody {
		payload: Option<Vec<u8>>,
		probe: Probe,
	}
	impl ProbeBody {
		pub(crate) fn json(payload: &str, probe: &Probe) -> Self {
			Self { payload: Some(payload.as_bytes().to_vec()), probe: probe.clone() }
		}

		/// Body whose read always fails, mirroring a stream that throws on access.
		pub(crate) fn unreadable(probe: &Probe) -> Self {
			Self { payload: None, probe: probe.clone() }
		}
	}
	impl ResponseBody for ProbeBody {
		fn read_to_end(self: Box<Self>) -> BodyFuture {
			Box::pin(async move {
				self.probe.reads.fetch_add(1, Ordering::SeqCst);

				match &self.payload {
					Some(bytes) => Ok(bytes.clone()),
					None => Err(TransportError::network(std::io::Error::other("stream exploded"))),
				}
			})
		}
	}
	impl Drop for ProbeBody {
		fn drop(&mut self) {
			self.probe.released.store(true, Ordering::SeqCst);
		}
	}

	fn deferred<T>(body: ProbeBody) -> DeferredResponse<T>
	where
		T: DeserializeOwned,
	{
		DeferredResponse::new(RawResponse::new(StatusCode::OK, HeaderMap::new(), body))
	}

	#[tokio::test]
	async fn materialize_decodes_bare_json_string_and_releases() {
		let probe = Probe::default();
		let mut response = deferred::<String>(ProbeBody::json("\"hogehoge\"", &probe));

		assert_eq!(probe.reads(), 0, "Constructing the wrapper must not read the body.");
		assert!(!probe.released());

		let value = response.materialize().await.expect("Valid JSON should materialize.");

		assert_eq!(value, "hogehoge");
		assert_eq!(probe.reads(), 1);
		assert!(probe.released());
		assert!(response.is_consumed());
	}

	#[tokio::test]
	async fn materialize_reports_malformed_payload_and_releases() {
		let probe = Probe::default();
		let mut response = deferred::<String>(ProbeBody::json("### Invalid JSON ###", &probe));
		let err = response.materialize().await.expect_err("Invalid JSON must fail to decode.");

		assert!(matches!(err, Error::MalformedPayload(PayloadError { status: 200, .. })));
		assert!(StdError::source(&err).is_some(), "Decode error must be attached.");
		assert!(probe.released());
	}

	#[tokio::test]
	async fn materialize_rejects_wrong_shape() {
		#[derive(Debug, Deserialize)]
		struct Token {
			#[allow(dead_code)]
			access_token: String,
		}

		let probe = Probe::default();
		let mut response = deferred::<Token>(ProbeBody::json("{\"error\":\"nope\"}", &probe));
		let err = response.materialize().await.expect_err("Missing field must fail to decode.");

		assert!(matches!(err, Error::MalformedPayload(_)));
		assert!(probe.released());
	}

	#[tokio::test]
	async fn repeated_materialize_replays_without_rereading() {
		let probe = Probe::default();
		let mut ok = deferred::<String>(ProbeBody::json("\"cached\"", &probe));

		ok.materialize().await.expect("First materialize should succeed.");

		let again = ok.materialize().await.expect("Second materialize should replay the value.");

		assert_eq!(again, "cached");
		assert_eq!(probe.reads(), 1);

		let bad_probe = Probe::default();
		let mut bad = deferred::<String>(ProbeBody::json("nope", &bad_probe));

		assert!(matches!(bad.materialize().await, Err(Error::MalformedPayload(_))));
		assert!(matches!(bad.materialize().await, Err(Error::MalformedPayload(_))));
		assert_eq!(bad_probe.reads(), 1);
	}

	#[tokio::test]
	async fn read_failure_releases_and_replays_as_unavailable() {
		let probe = Probe::default();
		let mut response = deferred::<String>(ProbeBody::unreadable(&probe));
		let first = response.materialize().await.expect_err("Unreadable body must fail.");

		assert!(matches!(first, Error::Transport(TransportError::Network { .. })));
		assert!(probe.released());

		let second = response.materialize().await.expect_err("Replay must fail consistently.");

		assert!(matches!(second, Error::Transport(TransportError::BodyUnavailable { .. })));
		assert_eq!(probe.reads(), 1);
	}

	#[test]
	fn discard_releases_without_reading_even_if_read_would_fail() {
		let probe = Probe::default();
		let mut response = deferred::<String>(ProbeBody::unreadable(&probe));

		response.discard();

		assert!(probe.released());
		assert_eq!(probe.reads(), 0);

		response.discard();

		assert_eq!(probe.reads(), 0, "Second discard must be a no-op.");
	}

	#[tokio::test]
	async fn discard_after_materialize_keeps_cached_value() {
		let probe = Probe::default();
		let mut response = deferred::<String>(ProbeBody::json("\"kept\"", &probe));

		response.materialize().await.expect("Materialize should succeed.");
		response.discard();

		assert_eq!(probe.reads(), 1);
		assert_eq!(response.materialize().await.expect("Cached value should remain."), "kept");
	}

	#[tokio::test]
	async fn materialize_after_discard_fails_loudly() {
		let probe = Probe::default();
		let mut response = deferred::<String>(ProbeBody::json("\"never\"", &probe));

		response.discard();

		let err = response.materialize().await.expect_err("Discarded body cannot be decoded.");

		assert!(matches!(err, Error::ResponseDiscarded));
		assert_eq!(probe.reads(), 0);
	}

	#[test]
	fn dropping_an_unconsumed_response_releases_it() {
		let probe = Probe::default();

		drop(deferred::<String>(ProbeBody::json("\"dropped\"", &probe)));

		assert!(probe.released());
		assert_eq!(probe.reads(), 0);
	}

	#[tokio::test]
	async fn into_value_moves_the_decoded_value_out() {
		let probe = Probe::default();
		let value = deferred::<Vec<u32>>(ProbeBody::json("[1,2,3]", &probe))
			.into_value()
			.await
			.expect("Array should decode.");

		assert_eq!(value, vec![1, 2, 3]);
		assert!(probe.released());
	}

	#[tokio::test]
	async fn ignore_response_discards_unread() {
		let probe = Probe::default();
		let body = ProbeBody::unreadable(&probe);
		let call = async move { Ok::<_, Error>(deferred::<String>(body)) };

		call.ignore_response().await.expect("Ignoring a response should not read it.");

		assert!(probe.released());
		assert_eq!(probe.reads(), 0);
	}
}
