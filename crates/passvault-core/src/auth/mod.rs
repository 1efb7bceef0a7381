//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionStore`: login/logout/restore with both-or-neither token and
//!   user state, publishing a `SessionBinding` to observers
//! - `SessionStorage`: persistence backends (`FileStorage`, `MemoryStorage`)
//! - `CredentialStore`: optional OS keychain storage of the account password

pub mod credentials;
pub mod error;
pub mod session;
pub mod storage;

pub use credentials::CredentialStore;
pub use error::AuthError;
pub use session::{Session, SessionBinding, SessionStore};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, TOKEN_KEY, USER_KEY};
