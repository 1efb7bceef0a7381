//! Sharing types: grants held by the current user, per-recipient share
//! results, and collaborator lists of owned records.

use serde::{Deserialize, Serialize};

use super::credential::CredentialRecord;

/// A grant giving the current user access to someone else's record.
///
/// On the wire the link is the underlying record's fields plus
/// `sharedRecordId`. `credential.id` is the underlying record id, while
/// `credential.favorite` and `credential.last_used_at` carry the values
/// local to this link, independent of the owner's flags.
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedCredentialLink {
    #[serde(rename = "sharedRecordId")]
    pub link_id: String,
    #[serde(flatten)]
    pub credential: CredentialRecord,
}

#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareStatus {
    Success,
    Failed,
}

/// Outcome of sharing with a single recipient.
///
/// The backend words the failure reason as `reason`, `message` or `error`,
/// sometimes several on one row; the first present wins in that order.
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ShareResultWire")]
pub struct ShareResult {
    pub email: String,
    pub status: ShareStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Deserialize)]
struct ShareResultWire {
    email: String,
    status: ShareStatus,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl From<ShareResultWire> for ShareResult {
    fn from(wire: ShareResultWire) -> Self {
        Self {
            email: wire.email,
            status: wire.status,
            reason: wire.reason.or(wire.message).or(wire.error),
        }
    }
}

impl ShareResult {
    pub fn is_failed(&self) -> bool {
        self.status == ShareStatus::Failed
    }
}

/// All per-recipient results of one share request.
///
/// Failed recipients are an expected outcome, not an error: callers keep
/// `failed_emails()` for correction and resubmit only those.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareOutcome {
    pub results: Vec<ShareResult>,
}

impl ShareOutcome {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn all_succeeded(&self) -> bool {
        !self.results.iter().any(ShareResult::is_failed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ShareResult> {
        self.results.iter().filter(|r| r.is_failed())
    }

    pub fn failed_emails(&self) -> Vec<String> {
        self.failed().map(|r| r.email.clone()).collect()
    }

    pub fn succeeded_emails(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| !r.is_failed())
            .map(|r| r.email.clone())
            .collect()
    }
}

/// A user an owned record has been shared with.
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorEntry {
    pub link_id: String,
    pub collaborator_user_id: String,
    pub collaborator_name: String,
    pub collaborator_email: String,
}
