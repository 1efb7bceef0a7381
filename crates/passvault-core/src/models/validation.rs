//! Field-level checks applied before a request leaves the client.

use thiserror::Error;

use super::credential::MIN_SECRET_LENGTH;

/// Minimum length for an account (login) password.
pub const MIN_ACCOUNT_PASSWORD_LENGTH: usize = 6;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("Enter a valid URL (https://example.com): {0}")]
    InvalidWebsite(String),

    #[error("Please enter a valid email address: {0}")]
    InvalidEmail(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown strength: {0}")]
    UnknownStrength(String),
}

pub(crate) fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(())
    }
}

pub(crate) fn secret(value: &str) -> Result<(), ValidationError> {
    min_length("password", value, MIN_SECRET_LENGTH)
}

fn min_length(field: &'static str, value: &str, min: usize) -> Result<(), ValidationError> {
    if value.chars().count() < min {
        Err(ValidationError::TooShort { field, min })
    } else {
        Ok(())
    }
}

/// An empty website is allowed; anything else must look like
/// `http(s)://host.tld`.
pub(crate) fn website(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"));
    match rest {
        Some(host) if has_inner_dot(host) => Ok(()),
        _ => Err(ValidationError::InvalidWebsite(trimmed.to_string())),
    }
}

/// Email must be `local@domain.tld` shaped.
pub fn email(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && has_inner_dot(domain) && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(ValidationError::InvalidEmail(trimmed.to_string())),
    }
}

/// Checks the login form before it is submitted.
pub fn login_form(email_address: &str, password: &str) -> Result<(), ValidationError> {
    email(email_address)?;
    min_length("password", password, MIN_ACCOUNT_PASSWORD_LENGTH)
}

/// Checks the registration form before it is submitted.
pub fn registration_form(name: &str, email_address: &str, password: &str) -> Result<(), ValidationError> {
    require("name", name)?;
    login_form(email_address, password)
}

fn has_inner_dot(s: &str) -> bool {
    match s.find('.') {
        Some(idx) => idx > 0 && idx + 1 < s.len(),
        None => false,
    }
}
