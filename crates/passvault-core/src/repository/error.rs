use thiserror::Error;

use crate::api::ApiError;
use crate::models::ValidationError;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Not logged in")]
    NotAuthenticated,

    #[error("No password with id {0}")]
    NotFound(String),

    #[error("Password {0} is shared with you and cannot be changed")]
    NotOwned(String),

    #[error("Password {0} is not a shared password")]
    NotShared(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl RepositoryError {
    /// Message suitable for a user notification.
    pub fn user_message(&self) -> String {
        match self {
            RepositoryError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}
