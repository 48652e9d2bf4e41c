//! Client registrations returned by `POST /api/v1/apps`.

// crates.io
use oauth2::ClientSecret;
// self
use crate::{
	_prelude::*,
	auth::{ClientId, TokenSecret},
};

/// Client identifier and secret issued once per instance by app registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredApp {
	/// OAuth client identifier.
	pub client_id: ClientId,
	/// OAuth client secret; callers must avoid logging it.
	pub client_secret: TokenSecret,
	/// Instance-side application record id, when reported.
	#[serde(default)]
	pub id: Option<String>,
	/// Registered application name, when echoed back.
	#[serde(default)]
	pub name: Option<String>,
	/// Registered application website, when echoed back.
	#[serde(default)]
	pub website: Option<String>,
	/// Registered redirect URI, when echoed back.
	#[serde(default)]
	pub redirect_uri: Option<String>,
}
impl RegisteredApp {
	/// Creates a registration from a known client id/secret pair.
	pub fn new(client_id: ClientId, client_secret: impl Into<String>) -> Self {
		Self {
			client_id,
			client_secret: TokenSecret::new(client_secret),
			id: None,
			name: None,
			website: None,
			redirect_uri: None,
		}
	}

	/// Client secret in the shape expected by the token exchange.
	pub fn oauth_client_secret(&self) -> ClientSecret {
		ClientSecret::new(self.client_secret.expose().to_owned())
	}
}
