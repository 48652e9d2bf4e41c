//! API entities consumed by credential verification.
//!
//! Only the fields the client relies on are modeled; unknown fields are ignored so newer
//! instances keep decoding.

// self
use crate::{_prelude::*, auth::AccountId};

/// Account returned by `GET /api/v1/accounts/verify_credentials`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
	/// Instance-local account identifier.
	pub id: AccountId,
	/// Local username, without the instance domain.
	pub username: String,
	/// WebFinger account URI (`username` locally, `username@domain` for remote accounts).
	pub acct: String,
	/// Profile display name.
	#[serde(default)]
	pub display_name: String,
	/// Whether the account manually approves followers.
	#[serde(default)]
	pub locked: bool,
	/// Public profile page.
	#[serde(default)]
	pub url: Option<String>,
	/// Static avatar image address.
	#[serde(default)]
	pub avatar_static: Option<String>,
}

/// Instance metadata returned by `GET /api/v1/instance`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceInfo {
	/// Domain name of the instance.
	pub uri: String,
	/// Instance title.
	#[serde(default)]
	pub title: String,
	/// Short description.
	#[serde(default)]
	pub short_description: Option<String>,
	/// Server software version.
	#[serde(default)]
	pub version: String,
}
