use thiserror::Error;

use crate::api::ApiError;
use crate::models::ValidationError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication failed: {0}")]
    Rejected(#[from] ApiError),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Server returned an empty token")]
    MissingToken,
}

impl AuthError {
    /// Message suitable for a user notification.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Rejected(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}
