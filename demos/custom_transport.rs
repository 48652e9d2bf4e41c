//! Plugs a custom transport into the client and shows deferred bodies being released.
//!
//! 1. Implement [`ApiHttpClient`] to turn requests into a status, headers, and a
//!    [`ResponseBody`] handle.
//! 2. Count reads and releases on the handle to see which calls decode and which discard.
//! 3. Pass the transport to [`ApiClient::with_http_client`].

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use color_eyre::Result;
// self
use mastodon_connect::{
	auth::{ClientId, TokenSecret},
	client::{ApiClient, AppProfile},
	error::{Error, TransportError},
	http::{ApiHttpClient, BodyFuture, HttpFuture, HttpRequest, RawResponse, ResponseBody},
	oauth2::{
		ClientSecret,
		http::{HeaderMap, StatusCode},
	},
	url::Url,
};

#[derive(Default)]
struct Counters {
	reads: AtomicUsize,
	releases: AtomicUsize,
}

/// Answers from a fixed routing table instead of the network.
#[derive(Default)]
struct CannedTransport {
	counters: Arc<Counters>,
}
impl ApiHttpClient for CannedTransport {
	fn execute(&self, request: HttpRequest) -> HttpFuture<'_> {
		let counters = self.counters.clone();

		Box::pin(async move {
			let (status, payload) = match request.uri().path() {
				"/api/v1/accounts/verify_credentials" =>
					(StatusCode::OK, "{\"id\":\"7\",\"username\":\"demo\",\"acct\":\"demo\"}"),
				"/api/v1/instance" => (StatusCode::OK, "{\"uri\":\"canned.example\"}"),
				"/oauth/revoke" => (StatusCode::OK, "{}"),
				path => {
					return Err(TransportError::network(std::io::Error::other(format!(
						"no canned route for {path}"
					)))
					.into());
				},
			};

			Ok(RawResponse::new(status, HeaderMap::new(), CannedBody { payload, counters }))
		})
	}
}

struct CannedBody {
	payload: &'static str,
	counters: Arc<Counters>,
}
impl ResponseBody for CannedBody {
	fn read_to_end(self: Box<Self>) -> BodyFuture {
		Box::pin(async move {
			self.counters.reads.fetch_add(1, Ordering::SeqCst);

			Ok(self.payload.as_bytes().to_vec())
		})
	}
}
impl Drop for CannedBody {
	fn drop(&mut self) {
		self.counters.releases.fetch_add(1, Ordering::SeqCst);
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let transport = CannedTransport::default();
	let counters = transport.counters.clone();
	let client: ApiClient<CannedTransport> =
		ApiClient::with_http_client(transport, AppProfile::default());
	let instance = Url::parse("https://canned.example")?;
	let token = TokenSecret::new("canned-token");
	let credential = client.verify_credential(&instance, token.clone()).await?;

	println!("Verified {} with id {}.", credential.username, credential.user_id);

	client
		.revoke_token(&instance, &ClientId::new("cid")?, &ClientSecret::new("sec".into()), &token)
		.await?;

	println!(
		"Bodies read: {}, bodies released: {}.",
		counters.reads.load(Ordering::SeqCst),
		counters.releases.load(Ordering::SeqCst)
	);

	match client.register_app(&instance).await {
		Err(Error::Transport(e)) => println!("Unrouted request failed as expected: {e}."),
		other => println!("Unexpected registration outcome: {other:?}."),
	}

	Ok(())
}
