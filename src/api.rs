//! Endpoint bindings for a single instance.
//!
//! Each method maps one-to-one onto a REST or OAuth endpoint and keeps the wire parameter
//! names. Writes return [`DeferredResponse`] handles; reads decode eagerly.

// crates.io
use oauth2::{AuthorizationCode, ClientSecret};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
// self
use crate::{
	_prelude::*,
	auth::{AccessTokenResponse, ClientId, RegisteredApp, Scopes, TokenSecret},
	connection::{ApiConnection, Params},
	deferred::DeferredResponse,
	entity::{Account, InstanceInfo},
	http::ApiHttpClient,
};

/// Characters escaped in the authorize query. `:` and `/` stay literal so redirect targets
/// such as `urn:ietf:wg:oauth:2.0:oob` read as-is; spaces become `+`.
const QUERY_VALUE: &AsciiSet =
	&NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~').remove(b':').remove(b'/');

/// `grant_type` used when exchanging an authorization code.
pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";
/// `response_type` requesting an authorization code.
pub const RESPONSE_TYPE_CODE: &str = "code";

/// Typed endpoint surface over an [`ApiConnection`].
pub struct InstanceApi<C>
where
	C: ?Sized + ApiHttpClient,
{
	connection: ApiConnection<C>,
}
impl<C> InstanceApi<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Wraps a connection.
	pub fn new(connection: ApiConnection<C>) -> Self {
		Self { connection }
	}

	/// Underlying connection.
	pub fn connection(&self) -> &ApiConnection<C> {
		&self.connection
	}

	/// `POST /api/v1/apps`
	pub async fn apps_register(
		&self,
		client_name: &str,
		redirect_uris: &str,
		scopes: Option<&Scopes>,
		website: Option<&str>,
	) -> Result<DeferredResponse<RegisteredApp>> {
		let form = Params::new()
			.with("client_name", client_name)
			.with("redirect_uris", redirect_uris)
			.with_opt("scopes", scopes.and_then(Scopes::to_param))
			.with_opt("website", website);

		self.connection.post_lazy("/api/v1/apps", &form).await
	}

	/// `GET /oauth/authorize`, built as a URL for the user's browser rather than called.
	pub fn oauth_authorize(
		&self,
		force_login: Option<bool>,
		response_type: &str,
		client_id: &ClientId,
		redirect_uri: &str,
		scope: Option<&Scopes>,
	) -> Result<Url> {
		let params = Params::new()
			.with("response_type", response_type)
			.with("client_id", client_id.as_ref())
			.with("redirect_uri", redirect_uri)
			.with_opt("force_login", force_login.map(|force| force.to_string()))
			.with_opt("scope", scope.and_then(Scopes::to_param));
		let mut url = self.connection.endpoint("/oauth/authorize")?;

		url.set_query(Some(&encode_query(&params)));

		Ok(url)
	}

	/// `POST /oauth/token` with `grant_type=authorization_code`.
	pub async fn oauth_token(
		&self,
		client_id: &ClientId,
		client_secret: &ClientSecret,
		redirect_uri: &str,
		scope: Option<&Scopes>,
		code: &AuthorizationCode,
	) -> Result<DeferredResponse<AccessTokenResponse>> {
		let form = Params::new()
			.with("client_id", client_id.as_ref())
			.with("client_secret", client_secret.secret().as_str())
			.with("redirect_uri", redirect_uri)
			.with("grant_type", GRANT_AUTHORIZATION_CODE)
			.with_opt("scope", scope.and_then(Scopes::to_param))
			.with("code", code.secret().as_str());

		self.connection.post_lazy("/oauth/token", &form).await
	}

	/// `POST /oauth/revoke`
	pub async fn oauth_revoke(
		&self,
		client_id: &ClientId,
		client_secret: &ClientSecret,
		token: &TokenSecret,
	) -> Result<DeferredResponse<serde_json::Value>> {
		let form = Params::new()
			.with("client_id", client_id.as_ref())
			.with("client_secret", client_secret.secret().as_str())
			.with("token", token.expose());

		self.connection.post_lazy("/oauth/revoke", &form).await
	}

	/// `GET /api/v1/accounts/verify_credentials`
	pub async fn accounts_verify_credentials(&self) -> Result<Account> {
		self.connection.get("/api/v1/accounts/verify_credentials", &Params::new()).await
	}

	/// `GET /api/v1/instance`
	pub async fn instance(&self) -> Result<InstanceInfo> {
		self.connection.get("/api/v1/instance", &Params::new()).await
	}
}
impl<C> Clone for InstanceApi<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn clone(&self) -> Self {
		Self { connection: self.connection.clone() }
	}
}
impl<C> Debug for InstanceApi<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("InstanceApi").field(&self.connection).finish()
	}
}

fn encode_query(params: &Params) -> String {
	let mut buf = String::new();

	for (idx, (key, value)) in params.iter().enumerate() {
		if idx > 0 {
			buf.push('&');
		}

		buf.push_str(key);
		buf.push('=');

		for (word_idx, word) in value.split(' ').enumerate() {
			if word_idx > 0 {
				buf.push('+');
			}

			buf.extend(utf8_percent_encode(word, QUERY_VALUE));
		}
	}

	buf
}
