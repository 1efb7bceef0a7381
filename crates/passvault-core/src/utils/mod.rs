//! Utility functions for formatting and password generation.

pub mod format;
pub mod generator;

pub use format::{
    contains_ignore_case, format_date, format_last_used, format_optional, mask_secret,
    truncate_string,
};
pub use generator::{generate_password, DEFAULT_PASSWORD_LENGTH};
