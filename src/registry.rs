//! Per-instance app registration cache with single-flight registration.
//!
//! Registration is a one-time, per-instance side effect: every call to `POST /api/v1/apps`
//! mints a fresh client id. [`AppRegistry`] consults its [`AppStore`] first and serializes
//! first-time registration per [`InstanceKey`], so concurrent callers for an unseen instance
//! share one network call and one result.

// self
use crate::{
	_prelude::*,
	auth::{InstanceKey, RegisteredApp},
	store::{AppStore, MemoryStore},
};

/// Cache of [`RegisteredApp`]s keyed by instance authority.
pub struct AppRegistry {
	store: Arc<dyn AppStore>,
	guards: Mutex<HashMap<InstanceKey, Arc<AsyncMutex<()>>>>,
}
impl AppRegistry {
	/// Creates a registry backed by the provided store.
	pub fn new(store: Arc<dyn AppStore>) -> Self {
		Self { store, guards: Default::default() }
	}

	/// Backing store.
	pub fn store(&self) -> &Arc<dyn AppStore> {
		&self.store
	}

	/// Returns the cached registration for `instance` without registering.
	pub async fn cached(&self, instance: &InstanceKey) -> Result<Option<RegisteredApp>> {
		Ok(self.store.load_app(instance).await?)
	}

	/// Returns the cached registration, or runs `register` exactly once per instance.
	///
	/// Callers racing on the same unseen instance wait for the first one and then read its
	/// result from the store. A failed registration is not cached; the next caller retries it.
	///
	/// A registration that succeeds but cannot be saved is still returned, since the instance
	/// has already issued the client id. Later callers miss the cache and register again.
	pub async fn get_or_register<F, Fut>(
		&self,
		instance: &InstanceKey,
		register: F,
	) -> Result<RegisteredApp>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<RegisteredApp>>,
	{
		if let Some(app) = self.cached(instance).await? {
			return Ok(app);
		}

		let guard = self.guard(instance);
		let _singleflight = guard.lock().await;

		if let Some(app) = self.cached(instance).await? {
			return Ok(app);
		}

		let app = register().await?;

		match self.store.save_app(instance.clone(), app.clone()).await {
			Ok(()) => self.release(instance, &guard),
			#[cfg(feature = "tracing")]
			Err(e) => tracing::warn!(%instance, error = %e, "Registered app could not be saved."),
			#[cfg(not(feature = "tracing"))]
			Err(_) => (),
		}

		Ok(app)
	}

	fn guard(&self, instance: &InstanceKey) -> Arc<AsyncMutex<()>> {
		let mut guards = self.guards.lock();

		guards.entry(instance.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}

	// Once the app is cached, later callers return before taking a guard.
	fn release(&self, instance: &InstanceKey, guard: &Arc<AsyncMutex<()>>) {
		let mut guards = self.guards.lock();

		if guards.get(instance).is_some_and(|current| Arc::ptr_eq(current, guard)) {
			guards.remove(instance);
		}
	}
}
impl Default for AppRegistry {
	fn default() -> Self {
		Self::new(Arc::new(MemoryStore::default()))
	}
}
impl Debug for AppRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppRegistry").field("guarded_instances", &self.guards.lock().len()).finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;
	use crate::{
		auth::ClientId,
		store::{StoreError, StoreFuture},
	};

	struct RejectingStore;
	impl AppStore for RejectingStore {
		fn load_app<'a>(&'a self, _: &'a InstanceKey) -> StoreFuture<'a, Option<RegisteredApp>> {
			Box::pin(async { Ok(None) })
		}

		fn save_app(&self, _: InstanceKey, _: RegisteredApp) -> StoreFuture<'_, ()> {
			Box::pin(async { Err(StoreError::Backend { message: "read-only".into() }) })
		}
	}

	fn key(value: &str) -> InstanceKey {
		InstanceKey::new(value).expect("Instance key fixture should be valid.")
	}

	fn app(client_id: &str) -> RegisteredApp {
		RegisteredApp::new(ClientId::new(client_id).expect("Client fixture should be valid."), "sec")
	}

	#[tokio::test]
	async fn concurrent_first_use_registers_once() {
		let registry = AppRegistry::default();
		let counter = AtomicUsize::new(0);
		let calls = &counter;
		let instance = key("example.social");
		let register = || async move {
			let n = calls.fetch_add(1, Ordering::SeqCst);

			tokio::time::sleep(std::time::Duration::from_millis(20)).await;

			Ok(app(&format!("cid-{n}")))
		};
		let (a, b) = tokio::join!(
			registry.get_or_register(&instance, register),
			registry.get_or_register(&instance, register)
		);
		let a = a.expect("First caller should register.");
		let b = b.expect("Second caller should reuse the registration.");

		assert_eq!(counter.load(Ordering::SeqCst), 1);
		assert_eq!(a, b);
		assert_eq!(a.client_id.as_ref(), "cid-0");
		assert!(registry.guards.lock().is_empty(), "Cached instances should not keep a guard.");
	}

	#[tokio::test]
	async fn unsaved_registration_is_still_returned() {
		let registry = AppRegistry::new(Arc::new(RejectingStore));
		let instance = key("example.social");
		let counter = AtomicUsize::new(0);
		let calls = &counter;
		let register = || async move {
			let n = calls.fetch_add(1, Ordering::SeqCst);

			Ok(app(&format!("cid-{n}")))
		};
		let first = registry
			.get_or_register(&instance, register)
			.await
			.expect("A registration the store rejects should still reach the caller.");

		assert_eq!(first.client_id.as_ref(), "cid-0");

		let second = registry
			.get_or_register(&instance, register)
			.await
			.expect("The next caller should register again.");

		assert_eq!(second.client_id.as_ref(), "cid-1");
		assert_eq!(counter.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn failed_registration_is_not_cached() {
		let registry = AppRegistry::default();
		let instance = key("example.social");
		let err = registry
			.get_or_register(&instance, || async {
				Err(Error::Api { status: 503, message: "down".into(), retry_after: None })
			})
			.await
			.expect_err("Registration failure should propagate.");

		assert!(matches!(err, Error::Api { status: 503, .. }));
		assert_eq!(registry.cached(&instance).await.expect("Cache lookup should succeed."), None);

		let recovered = registry
			.get_or_register(&instance, || async { Ok(app("cid")) })
			.await
			.expect("A later registration should succeed.");

		assert_eq!(recovered.client_id.as_ref(), "cid");
	}

	#[tokio::test]
	async fn distinct_instances_register_independently() {
		let registry = AppRegistry::default();

		registry
			.get_or_register(&key("a.example"), || async { Ok(app("a")) })
			.await
			.expect("Registration should succeed.");

		let b = registry
			.get_or_register(&key("a.example:8443"), || async { Ok(app("b")) })
			.await
			.expect("Registration should succeed.");

		assert_eq!(b.client_id.as_ref(), "b");
	}
}
