//! Process-wide holder of the current session credential.

// self
use crate::{
	_prelude::*,
	auth::{SessionCredential, TokenSecret, UserIdentity},
	store::{MemoryStore, SessionPersistence, StoreError},
};

/// Default namespaced key the credential is persisted under.
pub const DEFAULT_SESSION_KEY: &str = "authed-client.session";

/// Owns the session credential and mirrors every mutation into a [`SessionPersistence`] backend.
///
/// Reads take a shared lock and never wait on I/O. Mutations swap the in-memory state first and
/// then invoke the persistence hook; a persistence failure is reported to the caller but the
/// in-memory state stays authoritative for the running process.
pub struct TokenStore {
	key: String,
	state: RwLock<SessionCredential>,
	persistence: Arc<dyn SessionPersistence>,
}
impl TokenStore {
	/// Opens the store, rehydrating the credential persisted under `key`.
	pub fn open(
		persistence: Arc<dyn SessionPersistence>,
		key: impl Into<String>,
	) -> Result<Self, StoreError> {
		let key = key.into();
		let state = persistence.load(&key)?.unwrap_or_default();

		tracing::debug!(
			key = %key,
			authenticated = state.is_authenticated(),
			"rehydrated session credential"
		);

		Ok(Self { key, state: RwLock::new(state), persistence })
	}

	/// Builds an empty store backed by a fresh [`MemoryStore`].
	pub fn in_memory() -> Self {
		Self {
			key: DEFAULT_SESSION_KEY.into(),
			state: RwLock::new(SessionCredential::default()),
			persistence: Arc::new(MemoryStore::default()),
		}
	}

	/// Returns the persistence key.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Replaces the whole credential (login).
	pub fn set_credential(
		&self,
		access: impl Into<String>,
		refresh: impl Into<String>,
		user: Option<UserIdentity>,
	) -> Result<(), StoreError> {
		let credential = SessionCredential::new(access, refresh, user);
		let mut guard = self.state.write();

		*guard = credential;

		self.persistence.save(&self.key, &guard)
	}

	/// Swaps in a renewed access token, keeping the refresh token and identity (refresh success).
	pub fn update_access(&self, access: TokenSecret) -> Result<(), StoreError> {
		let mut guard = self.state.write();

		guard.access = Some(access);
		guard.updated_at = Some(OffsetDateTime::now_utc());

		self.persistence.save(&self.key, &guard)
	}

	/// Drops both tokens and the identity (logout, unrecoverable refresh failure).
	pub fn clear_credential(&self) -> Result<(), StoreError> {
		let mut guard = self.state.write();

		*guard = SessionCredential::default();

		self.persistence.remove(&self.key)
	}

	/// Returns the current access token, if one is present.
	pub fn current_access(&self) -> Option<TokenSecret> {
		self.state.read().access.clone()
	}

	/// Returns the current refresh token, if one is present.
	pub fn current_refresh(&self) -> Option<TokenSecret> {
		self.state.read().refresh.clone()
	}

	/// Returns the signed-in identity, if known.
	pub fn current_user(&self) -> Option<UserIdentity> {
		self.state.read().user.clone()
	}

	/// Returns a copy of the full credential.
	pub fn snapshot(&self) -> SessionCredential {
		self.state.read().clone()
	}

	/// Returns `true` when requests can be signed.
	pub fn is_authenticated(&self) -> bool {
		self.state.read().is_authenticated()
	}
}
impl Default for TokenStore {
	fn default() -> Self {
		Self::in_memory()
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenStore")
			.field("key", &self.key)
			.field("state", &*self.state.read())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn mutations_are_mirrored_into_persistence() {
		let backend = Arc::new(MemoryStore::default());
		let store = TokenStore::open(backend.clone(), "ns.session").expect("Store should open.");

		store.set_credential("access-1", "refresh-1", None).expect("Login should persist.");

		assert_eq!(
			backend.load("ns.session").expect("Load should succeed.").and_then(|c| c.access),
			Some(TokenSecret::new("access-1")),
		);

		store.update_access(TokenSecret::new("access-2")).expect("Refresh should persist.");

		let persisted = backend
			.load("ns.session")
			.expect("Load should succeed.")
			.expect("Credential should remain persisted.");

		assert_eq!(persisted.access, Some(TokenSecret::new("access-2")));
		assert_eq!(persisted.refresh, Some(TokenSecret::new("refresh-1")));

		store.clear_credential().expect("Logout should persist.");

		assert!(backend.is_empty());
		assert!(store.current_access().is_none());
		assert!(store.current_refresh().is_none());
	}

	#[test]
	fn open_rehydrates_and_missing_key_means_logged_out() {
		let backend = Arc::new(MemoryStore::default());
		let user = UserIdentity { id: 3, username: "grace".into() };

		backend
			.save("ns.session", &SessionCredential::new("a", "r", Some(user.clone())))
			.expect("Seed should succeed.");

		let store = TokenStore::open(backend.clone(), "ns.session").expect("Store should open.");

		assert!(store.is_authenticated());
		assert_eq!(store.current_user(), Some(user));

		let other = TokenStore::open(backend, "ns.other").expect("Store should open.");

		assert!(!other.is_authenticated());
		assert!(other.snapshot().is_empty());
	}

	#[test]
	fn empty_access_is_unauthenticated_even_with_refresh() {
		let store = TokenStore::in_memory();

		store.set_credential("", "refresh-only", None).expect("Set should succeed.");

		assert!(!store.is_authenticated());
		assert_eq!(store.current_refresh(), Some(TokenSecret::new("refresh-only")));
	}
}
