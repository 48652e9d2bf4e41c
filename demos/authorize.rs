//! Runs the out-of-band authorization flow against a live instance.
//!
//! ```sh
//! cargo run --example authorize -- mastodon.social
//! ```
//!
//! The demo registers an app (once per instance), prints the authorization URL, reads the code
//! the instance displays, exchanges it, and verifies the resulting token.

// std
use std::{
	io::{self, BufRead, Write},
	sync::Arc,
};
// crates.io
use color_eyre::{Result, eyre::eyre};
// self
use mastodon_connect::{
	client::{AppProfile, ReqwestApiClient, instance_url},
	error::Error,
	oauth2::AuthorizationCode,
	store::{CredentialStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let host = std::env::args().nth(1).ok_or_else(|| eyre!("Usage: authorize <instance-host>"))?;
	let instance = instance_url(&host)?;
	let store = Arc::new(MemoryStore::default());
	let profile = AppProfile::new("mastodon-connect demo")
		.with_website("https://github.com/hack-ink/mastodon-connect");
	let mut client = ReqwestApiClient::new(profile)?.with_credential_store(store.clone());
	let app = client.register_app(&instance).await?;
	let authorize_url =
		client.authorization_uri(&instance, &app.client_id, &client.profile().scopes)?;

	println!("Open {authorize_url} and approve access.");
	print!("Authorization code: ");
	io::stdout().flush()?;

	let mut code = String::new();

	io::stdin().lock().read_line(&mut code)?;

	let token = match client
		.exchange_token(
			&instance,
			&app.client_id,
			&app.oauth_client_secret(),
			&AuthorizationCode::new(code.trim().to_owned()),
		)
		.await
	{
		Ok(token) => token,
		Err(Error::InvalidGrant { reason }) => {
			eprintln!("The code was rejected ({reason}); restart the demo for a fresh one.");

			return Ok(());
		},
		Err(e) => return Err(e.into()),
	};
	let credential = client.verify_credential(&instance, token).await?;

	client.initialize(&credential);

	println!("Signed in as {} (id {}).", client.username()?, client.user_id()?);
	println!("Stored credentials: {}.", store.list_credentials().await?.len());

	Ok(())
}
