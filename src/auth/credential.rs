//! Verified account credentials produced by the authorization flow.

// self
use crate::{
	_prelude::*,
	auth::{AccountId, InstanceKey, TokenSecret},
};

/// Immutable credential for one verified account on one instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
	/// Absolute base address of the instance.
	pub instance: Url,
	/// Instance-local account identifier.
	pub user_id: AccountId,
	/// Display identity in `username@instance` form.
	pub username: String,
	/// Bearer token for the account; callers must avoid logging it.
	pub access_token: TokenSecret,
}
impl Credential {
	/// Builds a credential from its verified parts.
	pub fn new(
		instance: Url,
		user_id: AccountId,
		username: impl Into<String>,
		access_token: TokenSecret,
	) -> Self {
		Self { instance, user_id, username: username.into(), access_token }
	}

	/// Authority key of the instance this credential belongs to.
	pub fn instance_key(&self) -> Result<InstanceKey> {
		InstanceKey::from_url(&self.instance).map_err(|e| crate::error::ConfigError::from(e).into())
	}
}
