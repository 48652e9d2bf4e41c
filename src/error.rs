//! Client-level error types shared across the transport, connection, and flow layers.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Decode failure produced by `serde_path_to_error` while materializing a JSON body.
pub type DecodeError = serde_path_to_error::Error<serde_json::Error>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response body is not valid JSON or does not match the expected shape.
	#[error(transparent)]
	MalformedPayload(#[from] PayloadError),

	/// Instance rejected the bearer token or client credentials.
	#[error("Instance rejected the credentials: {reason}.")]
	Unauthorized {
		/// Instance- or client-supplied reason string.
		reason: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Instance rejected the authorization grant (expired, reused, or unknown code).
	#[error("Instance rejected the authorization grant: {reason}.")]
	InvalidGrant {
		/// Instance- or client-supplied reason string.
		reason: String,
	},
	/// Instance answered with a non-success status that carries no credential semantics.
	#[error("Instance returned HTTP {status}: {message}.")]
	Api {
		/// HTTP status code.
		status: u16,
		/// Error message extracted from the body, or the body preview.
		message: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// An authenticated operation was attempted before a credential was configured.
	#[error("Client has not been initialized with a credential.")]
	Uninitialized,
	/// A deferred response was materialized after its body had been discarded.
	#[error("Response body was discarded before it was materialized.")]
	ResponseDiscarded,
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Instance address cannot be parsed or used as a base URL.
	#[error("Instance address `{address}` is invalid.")]
	InvalidInstance {
		/// Offending address.
		address: String,
		/// Underlying parsing failure, when one exists.
		#[source]
		source: Option<url::ParseError>,
	},
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// An identifier returned by or passed to the instance is invalid.
	#[error("Identifier is invalid.")]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Builds an [`ConfigError::InvalidInstance`] for the provided address.
	pub fn invalid_instance(address: impl Into<String>, source: Option<url::ParseError>) -> Self {
		Self::InvalidInstance { address: address.into(), source }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, timeout, unreadable body).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the instance.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request did not complete before the transport's deadline.
	#[error("Request timed out while calling the instance.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Response body could not be read; it has already been released.
	#[error("Response body could not be read: {message}.")]
	BodyUnavailable {
		/// Description of the original read failure.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}

/// JSON decode failure raised while materializing a response body.
///
/// The decode error is shared so a repeated materialization can re-fail with the same
/// diagnostics after the body itself has been released.
#[derive(Clone, Debug, ThisError)]
#[error("Response body is malformed JSON at `{path}`.", path = .source.path())]
pub struct PayloadError {
	/// Structured parsing failure, including the JSON path that failed.
	#[source]
	pub source: Arc<DecodeError>,
	/// HTTP status code of the response whose body failed to decode.
	pub status: u16,
}
impl PayloadError {
	/// Wraps a decode failure for a response with the given status.
	pub fn new(source: DecodeError, status: u16) -> Self {
		Self { source: Arc::new(source), status }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn store_error_converts_into_client_error_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let client_error: Error = store_error.clone().into();

		assert!(matches!(client_error, Error::Storage(_)));
		assert!(client_error.to_string().contains("database unreachable"));

		let source = StdError::source(&client_error)
			.expect("Client error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn payload_error_reports_failing_path() {
		#[derive(Debug, Deserialize)]
		struct Shape {
			#[allow(dead_code)]
			id: u64,
		}

		let mut de = serde_json::Deserializer::from_str("{\"id\":\"nope\"}");
		let source = serde_path_to_error::deserialize::<_, Shape>(&mut de)
			.expect_err("A string id must not decode into u64.");
		let err: Error = PayloadError::new(source, 200).into();

		assert!(matches!(err, Error::MalformedPayload(PayloadError { status: 200, .. })));
		assert!(err.to_string().contains("`id`"));
		assert!(StdError::source(&err).is_some());
	}
}
