//! In-memory caching for sharing data.
//!
//! This module provides the `CollaboratorCache`, which holds the
//! collaborator list of each owned record after it was first requested.
//! Nothing is written to disk.

pub mod collaborators;

pub use collaborators::{CachedData, CollaboratorCache};
