//! User-facing side effects requested by the core: notices and the login redirect.

// self
use crate::_prelude::*;

/// Terminal condition the user should be told about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
	/// The session ended and the user must sign in again.
	SessionExpired,
	/// The server answered 403.
	PermissionDenied,
	/// The server answered 404.
	NotFound,
	/// The server answered 422; carries the server detail when it sent one.
	Validation(Option<String>),
	/// The server answered 5xx and retries were exhausted.
	ServerError,
}
impl Notice {
	/// Fallback text for validation failures without a server detail.
	pub const GENERIC_VALIDATION: &'static str = "Invalid request parameters.";

	/// Returns the message shown to the user.
	pub fn message(&self) -> &str {
		match self {
			Self::SessionExpired => "Session expired, please sign in again.",
			Self::PermissionDenied => "Insufficient permission.",
			Self::NotFound => "The requested resource does not exist.",
			Self::Validation(Some(detail)) => detail,
			Self::Validation(None) => Self::GENERIC_VALIDATION,
			Self::ServerError => "Server error, please retry later.",
		}
	}
}
impl Display for Notice {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.message())
	}
}

/// UI collaborator that surfaces notices and performs the login redirect.
pub trait Presenter
where
	Self: Send + Sync,
{
	/// Shows `notice` to the user.
	fn notify(&self, notice: Notice);

	/// Navigates to the login view unless it is already displayed.
	fn redirect_to_login(&self);
}

/// Presenter that only writes notices to the log; used when no UI is attached.
#[derive(Clone, Debug, Default)]
pub struct LogPresenter;
impl Presenter for LogPresenter {
	fn notify(&self, notice: Notice) {
		tracing::warn!(notice = %notice, "user notice");
	}

	fn redirect_to_login(&self) {
		tracing::info!("login redirect requested");
	}
}
