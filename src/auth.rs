//! Session credentials, redacted token secrets, and the process-wide token store.

pub mod secret;
pub mod session;
pub mod token_store;

pub use secret::*;
pub use session::*;
pub use token_store::*;
