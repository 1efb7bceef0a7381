//! REST API client module for the PassVault backend.
//!
//! This module provides the `ApiClient` for authenticating and for reading
//! and mutating owned records, shared links and collaborator lists.
//!
//! Authenticated requests use a bearer token carried by the client
//! instance; the session store hands out token-bound clients.

pub mod client;
pub mod error;

pub use client::{ApiClient, LoginResponse, PasswordCollections};
pub use error::ApiError;
