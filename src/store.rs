//! Persistence contracts and built-in backends for the session credential.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::SessionCredential};

/// Durable storage hook invoked by [`TokenStore`](crate::auth::TokenStore) on every mutation.
///
/// Calls are synchronous so a credential change and its persistence happen without a
/// suspension point in between. A missing key means "logged out".
pub trait SessionPersistence
where
	Self: Send + Sync,
{
	/// Loads the credential stored under `key`, if any.
	fn load(&self, key: &str) -> Result<Option<SessionCredential>, StoreError>;

	/// Persists or replaces the credential stored under `key`.
	fn save(&self, key: &str, credential: &SessionCredential) -> Result<(), StoreError>;

	/// Removes the credential stored under `key`.
	fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Error type produced by [`SessionPersistence`] implementations.
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
