//! Credential repository and the views derived from it.
//!
//! `CredentialRepository` owns the two collections for the logged-in user
//! and performs every mutation against the backend. `view` holds the pure
//! derivations the presentation layer renders: the unified list, filters,
//! search, recently used entries and strength statistics.

pub mod credentials;
pub mod error;
mod state;
pub mod view;

pub use credentials::{CredentialRepository, FetchOutcome};
pub use error::RepositoryError;
pub use view::{SecurityStats, ViewFilter, RECENTLY_USED_LIMIT};
