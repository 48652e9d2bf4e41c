//! OAuth 2.0 out-of-band flow and credential verification.
//!
//! [`ApiClient`] drives the externally sequenced flow: register an app per instance, build the
//! authorization URL for the user, exchange the displayed code for a token, and verify that
//! token into a [`Credential`]. Every step is a separate call; the only state the client keeps
//! between calls is the shared [`AppRegistry`] and, after [`ApiClient::initialize`], the
//! [`Session`] of one verified account.

// crates.io
use oauth2::{AuthorizationCode, ClientSecret};
// self
use crate::{
	_prelude::*,
	api::{InstanceApi, RESPONSE_TYPE_CODE},
	auth::{AccountId, ClientId, Credential, InstanceKey, RegisteredApp, Scopes, TokenSecret},
	connection::ApiConnection,
	deferred::IgnoreResponse,
	error::ConfigError,
	http::ApiHttpClient,
	obs::{self, OperationKind},
	registry::AppRegistry,
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Client specialized for the crate's default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestApiClient = ApiClient<ReqwestHttpClient>;

/// Redirect target that makes the instance display the authorization code to the user.
pub const OUT_OF_BAND_REDIRECT: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Application identity presented to instances during registration and authorization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppProfile {
	/// Name shown to users on the authorization page.
	pub client_name: String,
	/// Optional application homepage.
	pub website: Option<String>,
	/// Scopes requested at registration, authorization, and token exchange.
	pub scopes: Scopes,
	/// Redirect target; the out-of-band URN unless overridden.
	pub redirect_uri: String,
}
impl AppProfile {
	/// Creates a profile requesting `read write follow` with the out-of-band redirect.
	pub fn new(client_name: impl Into<String>) -> Self {
		Self {
			client_name: client_name.into(),
			website: None,
			scopes: Scopes::standard(),
			redirect_uri: OUT_OF_BAND_REDIRECT.into(),
		}
	}

	/// Sets the application homepage.
	pub fn with_website(mut self, website: impl Into<String>) -> Self {
		self.website = Some(website.into());

		self
	}

	/// Overrides the requested scopes.
	pub fn with_scopes(mut self, scopes: Scopes) -> Self {
		self.scopes = scopes;

		self
	}

	/// Overrides the redirect target after validating it as a URI.
	pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Result<Self> {
		let redirect_uri = redirect_uri.into();

		Url::parse(&redirect_uri).map_err(|source| ConfigError::InvalidRedirect { source })?;

		self.redirect_uri = redirect_uri;

		Ok(self)
	}
}
impl Default for AppProfile {
	fn default() -> Self {
		Self::new(env!("CARGO_PKG_NAME"))
	}
}

/// Verified account bound to an authenticated endpoint surface.
pub struct Session<C>
where
	C: ?Sized + ApiHttpClient,
{
	api: InstanceApi<C>,
	credential: Credential,
}
impl<C> Session<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Authenticated endpoint bindings.
	pub fn api(&self) -> &InstanceApi<C> {
		&self.api
	}

	/// Credential the session was built from.
	pub fn credential(&self) -> &Credential {
		&self.credential
	}
}
impl<C> Clone for Session<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn clone(&self) -> Self {
		Self { api: self.api.clone(), credential: self.credential.clone() }
	}
}
impl<C> Debug for Session<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session").field("credential", &self.credential).finish()
	}
}

/// Coordinates app registration, authorization, token exchange, and verification.
///
/// The transport and registry are shared handles, so cloning a client or passing the same
/// [`AppRegistry`] to several clients keeps one registration per instance across all of them.
pub struct ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	http_client: Arc<C>,
	profile: AppProfile,
	registry: Arc<AppRegistry>,
	credential_store: Option<Arc<dyn CredentialStore>>,
	session: Option<Session<C>>,
}
impl<C> ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_http_client(http_client: impl Into<Arc<C>>, profile: AppProfile) -> Self {
		Self {
			http_client: http_client.into(),
			profile,
			registry: Default::default(),
			credential_store: None,
			session: None,
		}
	}

	/// Replaces the app registry, typically to share it between clients.
	pub fn with_registry(mut self, registry: Arc<AppRegistry>) -> Self {
		self.registry = registry;

		self
	}

	/// Configures where verified credentials are saved and loaded from.
	pub fn with_credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
		self.credential_store = Some(store);

		self
	}

	/// Application identity used by this client.
	pub fn profile(&self) -> &AppProfile {
		&self.profile
	}

	/// Shared app registry.
	pub fn registry(&self) -> &Arc<AppRegistry> {
		&self.registry
	}

	/// Returns the instance's app registration, registering on first use.
	///
	/// At most one `POST /api/v1/apps` is issued per instance, even under concurrent first use.
	pub async fn register_app(&self, instance: &Url) -> Result<RegisteredApp> {
		obs::observe(OperationKind::RegisterApp, "register_app", async move {
			let key = InstanceKey::from_url(instance).map_err(ConfigError::from)?;
			let api = self.public_api(instance);
			let profile = &self.profile;

			self.registry
				.get_or_register(&key, || async move {
					api.apps_register(
						&profile.client_name,
						&profile.redirect_uri,
						Some(&profile.scopes),
						profile.website.as_deref(),
					)
					.await?
					.into_value()
					.await
				})
				.await
		})
		.await
	}

	/// Builds the URL the user visits to approve access. No request is made.
	///
	/// The redirect is [`AppProfile::redirect_uri`]: the out-of-band URN unless the profile
	/// overrides it, in which case the override must match the one used at registration.
	pub fn authorization_uri(
		&self,
		instance: &Url,
		client_id: &ClientId,
		scopes: &Scopes,
	) -> Result<Url> {
		self.public_api(instance).oauth_authorize(
			None,
			RESPONSE_TYPE_CODE,
			client_id,
			&self.profile.redirect_uri,
			Some(scopes),
		)
	}

	/// Exchanges an authorization code for a bearer token.
	///
	/// An expired, reused, or mistyped code fails with [`Error::InvalidGrant`]; rejected
	/// client credentials fail with [`Error::Unauthorized`].
	pub async fn exchange_token(
		&self,
		instance: &Url,
		client_id: &ClientId,
		client_secret: &ClientSecret,
		code: &AuthorizationCode,
	) -> Result<TokenSecret> {
		obs::observe(OperationKind::ExchangeToken, "exchange_token", async move {
			let token = self
				.public_api(instance)
				.oauth_token(
					client_id,
					client_secret,
					&self.profile.redirect_uri,
					Some(&self.profile.scopes),
					code,
				)
				.await?
				.into_value()
				.await?;

			Ok(token.access_token)
		})
		.await
	}

	/// Verifies `access_token` against the instance and builds the account's [`Credential`].
	///
	/// The credential is saved to the configured [`CredentialStore`], if any. The client's own
	/// session is left untouched; call [`ApiClient::initialize`] to adopt it.
	pub async fn verify_credential(
		&self,
		instance: &Url,
		access_token: TokenSecret,
	) -> Result<Credential> {
		obs::observe(OperationKind::VerifyCredential, "verify_credential", async move {
			let connection = self.connection(instance).with_access_token(access_token.clone());
			let api = InstanceApi::new(connection);
			let account = api.accounts_verify_credentials().await?;
			let info = api.instance().await?;
			let username = format!("{}@{}", account.username, info.uri);
			let credential = Credential::new(instance.clone(), account.id, username, access_token);

			if let Some(store) = &self.credential_store {
				store.save_credential(credential.clone()).await?;
			}

			Ok(credential)
		})
		.await
	}

	/// Revokes a bearer token. The response body is released unread.
	pub async fn revoke_token(
		&self,
		instance: &Url,
		client_id: &ClientId,
		client_secret: &ClientSecret,
		token: &TokenSecret,
	) -> Result<()> {
		obs::observe(OperationKind::RevokeToken, "revoke_token", async move {
			self.public_api(instance)
				.oauth_revoke(client_id, client_secret, token)
				.ignore_response()
				.await
		})
		.await
	}

	/// Adopts a verified credential for authenticated calls.
	pub fn initialize(&mut self, credential: &Credential) {
		let connection = self
			.connection(&credential.instance)
			.with_access_token(credential.access_token.clone());

		self.session =
			Some(Session { api: InstanceApi::new(connection), credential: credential.clone() });
	}

	/// Loads `username`'s credential from the configured store and adopts it.
	///
	/// Fails with [`Error::Uninitialized`] when no store is configured or no credential is
	/// recorded for `username`.
	pub async fn initialize_from_store(&mut self, username: &str) -> Result<Credential> {
		let store = self.credential_store.clone().ok_or(Error::Uninitialized)?;
		let credential = store.load_credential(username).await?.ok_or(Error::Uninitialized)?;

		self.initialize(&credential);

		Ok(credential)
	}

	/// Returns true once a credential has been adopted.
	pub fn is_initialized(&self) -> bool {
		self.session.is_some()
	}

	/// Current session, or [`Error::Uninitialized`].
	pub fn session(&self) -> Result<&Session<C>> {
		self.session.as_ref().ok_or(Error::Uninitialized)
	}

	/// Authenticated endpoint bindings, or [`Error::Uninitialized`].
	pub fn api(&self) -> Result<&InstanceApi<C>> {
		self.session().map(Session::api)
	}

	/// Account id of the adopted credential, or [`Error::Uninitialized`].
	pub fn user_id(&self) -> Result<&AccountId> {
		self.session().map(|session| &session.credential.user_id)
	}

	/// `username@instance` of the adopted credential, or [`Error::Uninitialized`].
	pub fn username(&self) -> Result<&str> {
		self.session().map(|session| session.credential.username.as_str())
	}

	fn connection(&self, instance: &Url) -> ApiConnection<C> {
		ApiConnection::with_http_client(instance.clone(), self.http_client.clone())
	}

	fn public_api(&self, instance: &Url) -> InstanceApi<C> {
		InstanceApi::new(self.connection(instance))
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestHttpClient> {
	/// Creates a client backed by the default reqwest transport.
	///
	/// Requests give up after [`ReqwestHttpClient::DEFAULT_TIMEOUT`] with
	/// [`TransportError::Timeout`](crate::error::TransportError::Timeout).
	pub fn new(profile: AppProfile) -> Result<Self> {
		Ok(Self::with_http_client(ReqwestHttpClient::new()?, profile))
	}
}
impl<C> Clone for ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			profile: self.profile.clone(),
			registry: self.registry.clone(),
			credential_store: self.credential_store.clone(),
			session: self.session.clone(),
		}
	}
}
impl<C> Debug for ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("profile", &self.profile)
			.field("registry", &self.registry)
			.field("credential_store", &self.credential_store.is_some())
			.field("session", &self.session)
			.finish()
	}
}

/// Parses an instance address given either as a bare host (`mastodon.social`) or a URL.
///
/// Bare hosts are assumed to be served over HTTPS.
pub fn instance_url(address: &str) -> Result<Url> {
	let trimmed = address.trim();
	let candidate =
		if trimmed.contains("://") { trimmed.to_owned() } else { format!("https://{trimmed}/") };
	let url = Url::parse(&candidate)
		.map_err(|e| ConfigError::invalid_instance(address, Some(e)))?;

	if url.host_str().is_none_or(str::is_empty) || url.cannot_be_a_base() {
		return Err(ConfigError::invalid_instance(address, None).into());
	}

	Ok(url)
}
