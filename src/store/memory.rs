//! Thread-safe in-memory [`SessionPersistence`] for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::SessionCredential,
	store::{SessionPersistence, StoreError},
};

type StoreMap = Arc<RwLock<HashMap<String, SessionCredential>>>;

/// Storage backend that keeps credentials in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Returns the number of stored keys.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl SessionPersistence for MemoryStore {
	fn load(&self, key: &str) -> Result<Option<SessionCredential>, StoreError> {
		Ok(self.0.read().get(key).cloned())
	}

	fn save(&self, key: &str, credential: &SessionCredential) -> Result<(), StoreError> {
		self.0.write().insert(key.to_owned(), credential.clone());

		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), StoreError> {
		self.0.write().remove(key);

		Ok(())
	}
}
