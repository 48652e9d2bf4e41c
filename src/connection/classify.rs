//! Classification of non-success instance responses.
//!
//! Instances report failures in two shapes: OAuth endpoints answer with RFC 6749 style
//! `{"error": "...", "error_description": "..."}` bodies, while REST endpoints put a human
//! readable message into `error`. Both are folded into an [`ErrorContext`] that keeps only
//! primitive data, then mapped onto the crate error taxonomy.

// self
use crate::{_prelude::*, http::RawResponse};

/// Canonical categories for a rejected request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
	/// Authorization code (or other grant) was expired, reused, or unknown.
	InvalidGrant,
	/// Bearer token or client credentials were rejected.
	Unauthorized,
	/// Any other non-success response.
	Rejected,
}

/// Error details extracted from a non-success response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorContext {
	/// HTTP status code returned by the instance.
	pub http_status: u16,
	/// Instance-supplied `error` field.
	pub api_error: Option<String>,
	/// Instance-supplied `error_description` field.
	pub error_description: Option<String>,
	/// Preview of the response body for non-JSON payloads.
	pub body_preview: Option<String>,
	/// `Retry-After` hint, when the instance sent one.
	pub retry_after: Option<Duration>,
}
impl ErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates an empty context for the provided status code.
	pub fn new(http_status: u16) -> Self {
		Self {
			http_status,
			api_error: None,
			error_description: None,
			body_preview: None,
			retry_after: None,
		}
	}

	/// Builds a context from raw body bytes, extracting structured fields when the body is JSON.
	pub fn from_body(http_status: u16, body: &[u8]) -> Self {
		let mut ctx = Self::new(http_status);

		match serde_json::from_slice::<ErrorBody>(body) {
			Ok(ErrorBody { error, error_description }) => {
				ctx.api_error = error.filter(|value| !value.is_empty());
				ctx.error_description = error_description.filter(|value| !value.is_empty());

				ctx
			},
			Err(_) => {
				let text = String::from_utf8_lossy(body);
				let text = text.trim();

				if text.is_empty() { ctx } else { ctx.with_body_preview(text) }
			},
		}
	}

	/// Adds the `error` field returned by the instance.
	pub fn with_api_error(mut self, error: impl Into<String>) -> Self {
		self.api_error = Some(error.into());

		self
	}

	/// Adds the `error_description` field.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Adds a body preview for non-JSON payloads.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		self.body_preview = Some(truncate_preview(body.into()));

		self
	}

	/// Adds a `Retry-After` hint.
	pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
		self.retry_after = retry_after;

		self
	}

	/// Categorizes the failure.
	///
	/// Structured fields win over body text, and the status code decides last.
	pub fn kind(&self) -> ErrorKind {
		if let Some(kind) = self.api_error.as_deref().and_then(match_exact_value) {
			return kind;
		}
		if let Some(kind) = classify_text(self.body_preview.as_deref()) {
			return kind;
		}

		match self.http_status {
			401 | 403 => ErrorKind::Unauthorized,
			_ => ErrorKind::Rejected,
		}
	}

	/// Best human-readable explanation available.
	pub fn reason(&self) -> String {
		self.error_description
			.as_ref()
			.or(self.api_error.as_ref())
			.or(self.body_preview.as_ref())
			.cloned()
			.unwrap_or_else(|| format!("HTTP {}", self.http_status))
	}

	/// Converts the context into the matching client error.
	pub fn into_error(self) -> Error {
		match self.kind() {
			ErrorKind::InvalidGrant => Error::InvalidGrant { reason: self.reason() },
			ErrorKind::Unauthorized =>
				Error::Unauthorized { reason: self.reason(), status: Some(self.http_status) },
			ErrorKind::Rejected => Error::Api {
				status: self.http_status,
				message: self.reason(),
				retry_after: self.retry_after,
			},
		}
	}
}

#[derive(Deserialize)]
struct ErrorBody {
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	error_description: Option<String>,
}

/// Reads a rejected response's body, releasing it, and returns the classified error.
pub(crate) async fn reject(response: RawResponse) -> Error {
	let retry_after = response.retry_after();
	let RawResponse { status, body, .. } = response;

	match body.read_to_end().await {
		Ok(bytes) =>
			ErrorContext::from_body(status.as_u16(), &bytes).with_retry_after(retry_after).into_error(),
		Err(e) => e.into(),
	}
}

fn truncate_preview(body: String) -> String {
	if body.chars().count() <= ErrorContext::BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf = String::new();

	for (idx, ch) in body.chars().enumerate() {
		if idx >= ErrorContext::BODY_PREVIEW_LIMIT {
			buf.push('…');

			break;
		}
		buf.push(ch);
	}

	buf
}

fn match_exact_value(value: &str) -> Option<ErrorKind> {
	if value.eq_ignore_ascii_case("invalid_grant") {
		Some(ErrorKind::InvalidGrant)
	} else if value.eq_ignore_ascii_case("invalid_client")
		|| value.eq_ignore_ascii_case("unauthorized_client")
		|| value.eq_ignore_ascii_case("invalid_token")
		|| value.eq_ignore_ascii_case("access_denied")
	{
		Some(ErrorKind::Unauthorized)
	} else {
		None
	}
}

fn classify_text(body: Option<&str>) -> Option<ErrorKind> {
	let lowered = body?.to_ascii_lowercase();

	match lowered.as_str() {
		text if text.contains("invalid_grant") => Some(ErrorKind::InvalidGrant),
		text if text.contains("invalid_client") || text.contains("invalid_token") =>
			Some(ErrorKind::Unauthorized),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::{HeaderMap, StatusCode};
	// self
	use super::*;
	use crate::deferred::tests::{Probe, ProbeBody};

	#[test]
	fn oauth_error_codes_win_over_status() {
		let ctx = ErrorContext::from_body(401, b"{\"error\":\"invalid_grant\"}");

		assert_eq!(ctx.kind(), ErrorKind::InvalidGrant);
		assert!(matches!(ctx.into_error(), Error::InvalidGrant { reason } if reason == "invalid_grant"));

		let ctx = ErrorContext::from_body(
			400,
			b"{\"error\":\"invalid_client\",\"error_description\":\"Client authentication failed\"}",
		);

		assert_eq!(ctx.kind(), ErrorKind::Unauthorized);
		assert_eq!(ctx.reason(), "Client authentication failed");
	}

	#[test]
	fn rest_style_messages_fall_back_to_status() {
		let ctx = ErrorContext::from_body(401, b"{\"error\":\"The access token is invalid\"}");

		assert_eq!(ctx.kind(), ErrorKind::Unauthorized);
		assert!(matches!(
			ctx.into_error(),
			Error::Unauthorized { status: Some(401), reason } if reason == "The access token is invalid"
		));

		let ctx = ErrorContext::from_body(422, b"{\"error\":\"Validation failed\"}");

		assert_eq!(ctx.kind(), ErrorKind::Rejected);
	}

	#[test]
	fn non_json_bodies_become_truncated_previews() {
		let long = "x".repeat(300);
		let ctx = ErrorContext::from_body(502, long.as_bytes());
		let preview = ctx.body_preview.clone().expect("Non-JSON body should produce a preview.");

		assert_eq!(preview.chars().count(), ErrorContext::BODY_PREVIEW_LIMIT + 1);
		assert!(preview.ends_with('…'));
		assert_eq!(ctx.kind(), ErrorKind::Rejected);

		let ctx = ErrorContext::from_body(400, b"<html>invalid_grant</html>");

		assert_eq!(ctx.kind(), ErrorKind::InvalidGrant);
	}

	#[test]
	fn rejected_errors_keep_retry_after() {
		let err = ErrorContext::new(429)
			.with_api_error("Too many requests")
			.with_retry_after(Some(Duration::seconds(30)))
			.into_error();

		assert!(matches!(
			err,
			Error::Api { status: 429, retry_after: Some(delay), .. } if delay == Duration::seconds(30)
		));
		assert_eq!(ErrorContext::new(500).reason(), "HTTP 500");
	}

	#[tokio::test]
	async fn reject_reads_and_releases_the_error_body() {
		let probe = Probe::default();
		let response = RawResponse::new(
			StatusCode::UNAUTHORIZED,
			HeaderMap::new(),
			ProbeBody::json("{\"error\":\"invalid_grant\"}", &probe),
		);
		let err = reject(response).await;

		assert!(matches!(err, Error::InvalidGrant { .. }));
		assert_eq!(probe.reads(), 1);
		assert!(probe.released());
	}

	#[tokio::test]
	async fn reject_surfaces_unreadable_error_bodies_as_transport_failures() {
		let probe = Probe::default();
		let response = RawResponse::new(
			StatusCode::BAD_GATEWAY,
			HeaderMap::new(),
			ProbeBody::unreadable(&probe),
		);

		assert!(matches!(reject(response).await, Error::Transport(_)));
		assert!(probe.released());
	}
}
