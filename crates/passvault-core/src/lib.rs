//! PassVault Core - client-side state for a password manager backend.
//!
//! This crate provides:
//! - API client for the PassVault REST backend
//! - Session store with persisted login and an observable session binding
//! - Credential repository combining owned records and shared links, with
//!   optimistic updates and a collaborator cache
//! - View derivations, validation and password generation
//!
//! It is presentation-agnostic; the `passvault` CLI is one consumer.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod models;
pub mod repository;
pub mod utils;

// Re-export commonly used types at crate root
pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, FileStorage, MemoryStorage, Session, SessionBinding, SessionStorage, SessionStore};
pub use config::Config;
pub use models::*;
pub use repository::{CredentialRepository, FetchOutcome, RepositoryError, SecurityStats, ViewFilter};
