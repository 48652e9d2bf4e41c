//! Bearer token secrets and the token endpoint's response shape.

// self
use crate::_prelude::*;

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Renders the `Authorization` header value for this secret.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.0)
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Body returned by `POST /oauth/token`.
///
/// Only `access_token` is required; instances differ on whether they echo the remaining
/// fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenResponse {
	/// Bearer token granted for the authorized account.
	pub access_token: TokenSecret,
	/// Token type, normally `Bearer`.
	#[serde(default)]
	pub token_type: Option<String>,
	/// Space-delimited scopes actually granted.
	#[serde(default)]
	pub scope: Option<String>,
	/// Unix timestamp at which the token was created.
	#[serde(default)]
	pub created_at: Option<i64>,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
		assert_eq!(secret.bearer(), "Bearer super-secret");
	}

	#[test]
	fn token_response_requires_only_the_access_token() {
		let minimal: AccessTokenResponse = serde_json::from_str("{\"access_token\":\"abc\"}")
			.expect("Minimal token response should decode.");

		assert_eq!(minimal.access_token.expose(), "abc");
		assert_eq!(minimal.token_type, None);

		let full: AccessTokenResponse = serde_json::from_str(
			"{\"access_token\":\"abc\",\"token_type\":\"Bearer\",\"scope\":\"read write follow\",\"created_at\":1573979017}",
		)
		.expect("Full token response should decode.");

		assert_eq!(full.token_type.as_deref(), Some("Bearer"));
		assert_eq!(full.created_at, Some(1573979017));
		assert!(serde_json::from_str::<AccessTokenResponse>("{\"token_type\":\"Bearer\"}").is_err());
	}
}
