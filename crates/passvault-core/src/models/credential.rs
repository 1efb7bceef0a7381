//! Credential records as stored by the backend.
//!
//! Wire format is camelCase JSON. The secret travels as `password` and the
//! strength rating as `passwordStrength`, matching the PassVault API.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{self, ValidationError};

/// Minimum accepted length for a stored secret.
pub const MIN_SECRET_LENGTH: usize = 8;

/// Category a credential is filed under.
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Social Media")]
    SocialMedia,
    Email,
    Banking,
    ECommerce,
    /// Also the fallback for categories this client does not know
    #[default]
    #[serde(other)]
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Email,
        Category::SocialMedia,
        Category::Banking,
        Category::ECommerce,
        Category::Other,
    ];

    /// Display title, identical to the wire name.
    pub fn title(&self) -> &'static str {
        match self {
            Category::SocialMedia => "Social Media",
            Category::Email => "Email",
            Category::Banking => "Banking",
            Category::ECommerce => "ECommerce",
            Category::Other => "Other",
        }
    }

    /// URL-style slug used for navigation filters (`social-media`).
    pub fn slug(&self) -> &'static str {
        match self {
            Category::SocialMedia => "social-media",
            Category::Email => "email",
            Category::Banking => "banking",
            Category::ECommerce => "ecommerce",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    /// Accepts either the display title or the slug, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.title().eq_ignore_ascii_case(needle) || c.slug().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ValidationError::UnknownCategory(needle.to_string()))
    }
}

/// Strength rating of a stored secret.
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Strength {
    Good,
    Strong,
    #[default]
    #[serde(other)]
    Weak,
}

impl Strength {
    pub const ALL: [Strength; 3] = [Strength::Weak, Strength::Good, Strength::Strong];
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strength::Weak => write!(f, "Weak"),
            Strength::Good => write!(f, "Good"),
            Strength::Strong => write!(f, "Strong"),
        }
    }
}

impl FromStr for Strength {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Strength::ALL
            .into_iter()
            .find(|st| st.to_string().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ValidationError::UnknownStrength(needle.to_string()))
    }
}

/// A credential owned by exactly one user.
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    pub username: String,
    #[serde(rename = "password")]
    pub secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default)]
    pub category: Category,
    #[serde(rename = "passwordStrength", default)]
    pub strength: Strength,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Fields supplied by the caller when creating a credential.
/// The server assigns id, timestamps and may recompute strength.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCredential {
    pub title: String,
    pub username: String,
    #[serde(rename = "password")]
    pub secret: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub category: Category,
    #[serde(rename = "passwordStrength")]
    pub strength: Strength,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub favorite: bool,
}

impl NewCredential {
    pub fn new(
        title: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            username: username.into(),
            secret: secret.into(),
            website: None,
            category: Category::default(),
            strength: Strength::default(),
            notes: None,
            favorite: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::require("title", &self.title)?;
        validation::require("username", &self.username)?;
        validation::secret(&self.secret)?;
        if let Some(ref website) = self.website {
            validation::website(website)?;
        }
        Ok(())
    }
}

/// Partial update for an owned credential. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(rename = "password", skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(rename = "passwordStrength", skip_serializing_if = "Option::is_none")]
    pub strength: Option<Strength>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
}

impl CredentialUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(ref title) = self.title {
            validation::require("title", title)?;
        }
        if let Some(ref username) = self.username {
            validation::require("username", username)?;
        }
        if let Some(ref secret) = self.secret {
            validation::secret(secret)?;
        }
        if let Some(ref website) = self.website {
            validation::website(website)?;
        }
        Ok(())
    }
}
