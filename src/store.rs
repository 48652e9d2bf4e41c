//! Persistence contracts for app registrations and verified credentials.
//!
//! The client never decides where state lives. It asks an [`AppStore`] for a cached
//! [`RegisteredApp`] per instance and hands verified [`Credential`]s to a [`CredentialStore`].
//! [`MemoryStore`] implements both for tests, demos, and short-lived processes.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{Credential, InstanceKey, RegisteredApp},
};

/// Future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Load/save contract for per-instance app registrations.
pub trait AppStore
where
	Self: Send + Sync,
{
	/// Fetches the registration recorded for the instance, if any.
	fn load_app<'a>(&'a self, instance: &'a InstanceKey) -> StoreFuture<'a, Option<RegisteredApp>>;

	/// Persists or replaces the registration for the instance.
	fn save_app(&self, instance: InstanceKey, app: RegisteredApp) -> StoreFuture<'_, ()>;
}

/// Load/save contract for verified credentials, keyed by `username@instance`.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Persists or replaces a credential.
	fn save_credential(&self, credential: Credential) -> StoreFuture<'_, ()>;

	/// Fetches the credential recorded for `username`, if any.
	fn load_credential<'a>(&'a self, username: &'a str) -> StoreFuture<'a, Option<Credential>>;

	/// Lists every stored credential.
	fn list_credentials(&self) -> StoreFuture<'_, Vec<Credential>>;
}

/// Error type produced by store implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn store_error_serializes_with_its_message() {
		let payload = serde_json::to_string(&StoreError::Backend { message: "disk full".into() })
			.expect("StoreError should serialize to JSON.");

		assert_eq!(payload, "{\"Backend\":{\"message\":\"disk full\"}}");
	}
}
