//! Thread-safe in-memory [`AppStore`] and [`CredentialStore`] implementation.

// self
use crate::{
	_prelude::*,
	auth::{Credential, InstanceKey, RegisteredApp},
	store::{AppStore, CredentialStore, StoreFuture},
};

type AppMap = Arc<RwLock<HashMap<InstanceKey, RegisteredApp>>>;
type CredentialMap = Arc<RwLock<Vec<Credential>>>;

/// Storage backend that keeps registrations and credentials in-process.
///
/// Credentials keep insertion order; saving one whose username already exists replaces it in
/// place.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
	apps: AppMap,
	credentials: CredentialMap,
}
impl MemoryStore {
	/// Number of cached registrations.
	pub fn app_count(&self) -> usize {
		self.apps.read().len()
	}

	/// Number of stored credentials.
	pub fn credential_count(&self) -> usize {
		self.credentials.read().len()
	}

	fn upsert_credential(map: CredentialMap, credential: Credential) {
		let mut guard = map.write();

		match guard.iter_mut().find(|existing| existing.username == credential.username) {
			Some(existing) => *existing = credential,
			None => guard.push(credential),
		}
	}
}
impl AppStore for MemoryStore {
	fn load_app<'a>(&'a self, instance: &'a InstanceKey) -> StoreFuture<'a, Option<RegisteredApp>> {
		let map = self.apps.clone();

		Box::pin(async move { Ok(map.read().get(instance).cloned()) })
	}

	fn save_app(&self, instance: InstanceKey, app: RegisteredApp) -> StoreFuture<'_, ()> {
		let map = self.apps.clone();

		Box::pin(async move {
			map.write().insert(instance, app);

			Ok(())
		})
	}
}
impl CredentialStore for MemoryStore {
	fn save_credential(&self, credential: Credential) -> StoreFuture<'_, ()> {
		let map = self.credentials.clone();

		Box::pin(async move {
			Self::upsert_credential(map, credential);

			Ok(())
		})
	}

	fn load_credential<'a>(&'a self, username: &'a str) -> StoreFuture<'a, Option<Credential>> {
		let map = self.credentials.clone();

		Box::pin(async move {
			Ok(map.read().iter().find(|credential| credential.username == username).cloned())
		})
	}

	fn list_credentials(&self) -> StoreFuture<'_, Vec<Credential>> {
		let map = self.credentials.clone();

		Box::pin(async move { Ok(map.read().clone()) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::{AccountId, ClientId, TokenSecret};

	fn credential(username: &str, token: &str) -> Credential {
		Credential::new(
			Url::parse("https://example.social").expect("Instance fixture should parse."),
			AccountId::new("1").expect("Account fixture should be valid."),
			username,
			TokenSecret::new(token),
		)
	}

	#[tokio::test]
	async fn apps_are_keyed_by_instance() {
		let store = MemoryStore::default();
		let key = InstanceKey::new("example.social").expect("Instance key fixture should be valid.");
		let other =
			InstanceKey::new("example.social:8443").expect("Instance key fixture should be valid.");
		let app =
			RegisteredApp::new(ClientId::new("cid").expect("Client fixture should be valid."), "sec");

		store.save_app(key.clone(), app.clone()).await.expect("Saving an app should succeed.");

		assert_eq!(store.load_app(&key).await.expect("Load should succeed."), Some(app));
		assert_eq!(store.load_app(&other).await.expect("Load should succeed."), None);
		assert_eq!(store.app_count(), 1);
	}

	#[tokio::test]
	async fn credentials_upsert_by_username() {
		let store = MemoryStore::default();

		store
			.save_credential(credential("alice@example.social", "one"))
			.await
			.expect("Save should succeed.");
		store
			.save_credential(credential("bob@example.social", "two"))
			.await
			.expect("Save should succeed.");
		store
			.save_credential(credential("alice@example.social", "three"))
			.await
			.expect("Save should succeed.");

		let alice = store
			.load_credential("alice@example.social")
			.await
			.expect("Load should succeed.")
			.expect("Alice should be stored.");
		let all = store.list_credentials().await.expect("List should succeed.");

		assert_eq!(alice.access_token.expose(), "three");
		assert_eq!(all.len(), 2);
		assert_eq!(all[0].username, "alice@example.social");
		assert_eq!(store.credential_count(), 2);
	}
}
