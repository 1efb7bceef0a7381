//! Data models for PassVault entities.
//!
//! This module contains the data structures exchanged with the PassVault
//! API and exposed to the presentation layer:
//!
//! - `CredentialRecord`, `NewCredential`, `CredentialUpdate`: owned secrets
//! - `SharedCredentialLink`: access grants to another user's record
//! - `UnifiedEntry`: the merged owned + shared view element
//! - `ShareResult`, `ShareOutcome`, `CollaboratorEntry`: sharing
//! - `User`: the authenticated account

pub mod credential;
pub mod entry;
pub mod sharing;
pub mod user;
pub mod validation;

pub use credential::{Category, CredentialRecord, CredentialUpdate, NewCredential, Strength};
pub use entry::{EntryKey, UnifiedEntry};
pub use sharing::{CollaboratorEntry, ShareOutcome, ShareResult, ShareStatus, SharedCredentialLink};
pub use user::User;
pub use validation::ValidationError;
