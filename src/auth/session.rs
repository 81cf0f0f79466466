//! Session credential model persisted between process runs.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Identity of the signed-in user as returned by the login endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
	/// Server-side user identifier.
	pub id: u64,
	/// Login name.
	pub username: String,
}

/// Access/refresh credential pair plus the identity that owns it.
///
/// An absent access token means the session cannot sign requests, whatever the refresh token
/// holds.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredential {
	/// Short-lived bearer token.
	pub access: Option<TokenSecret>,
	/// Longer-lived token used only to mint new access tokens.
	pub refresh: Option<TokenSecret>,
	/// Signed-in user, when known.
	pub user: Option<UserIdentity>,
	/// Instant of the last mutation.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub updated_at: Option<OffsetDateTime>,
}
impl SessionCredential {
	/// Builds a credential, normalizing empty token strings to "absent".
	pub fn new(
		access: impl Into<String>,
		refresh: impl Into<String>,
		user: Option<UserIdentity>,
	) -> Self {
		Self {
			access: TokenSecret::non_empty(access),
			refresh: TokenSecret::non_empty(refresh),
			user,
			updated_at: Some(OffsetDateTime::now_utc()),
		}
	}

	/// Returns `true` when requests can be signed.
	pub fn is_authenticated(&self) -> bool {
		self.access.is_some()
	}

	/// Returns `true` when neither token is present.
	pub fn is_empty(&self) -> bool {
		self.access.is_none() && self.refresh.is_none()
	}
}
impl Debug for SessionCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionCredential")
			.field("access_set", &self.access.is_some())
			.field("refresh_set", &self.refresh.is_some())
			.field("user", &self.user)
			.field("updated_at", &self.updated_at)
			.finish()
	}
}
