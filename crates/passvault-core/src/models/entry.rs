//! The merged owned + shared entry exposed to the presentation layer.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::credential::{Category, CredentialRecord, Strength};
use super::sharing::SharedCredentialLink;

/// Addresses an entry in the unified view: the effective id plus which
/// backend collection it lives in. Owned records and shared links may
/// reuse the same id string, so both parts are needed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey {
    pub id: String,
    pub shared: bool,
}

impl EntryKey {
    pub fn owned(id: impl Into<String>) -> Self {
        Self { id: id.into(), shared: false }
    }

    pub fn shared(link_id: impl Into<String>) -> Self {
        Self { id: link_id.into(), shared: true }
    }
}

/// One element of the unified view.
#[derive(Debug, Clone, PartialEq)]
pub enum UnifiedEntry {
    Owned(CredentialRecord),
    Shared(SharedCredentialLink),
}

impl UnifiedEntry {
    /// Id used for every mutation call: the record id for owned entries,
    /// the link id for shared ones.
    pub fn effective_id(&self) -> &str {
        match self {
            UnifiedEntry::Owned(record) => &record.id,
            UnifiedEntry::Shared(link) => &link.link_id,
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, UnifiedEntry::Shared(_))
    }

    pub fn key(&self) -> EntryKey {
        EntryKey {
            id: self.effective_id().to_string(),
            shared: self.is_shared(),
        }
    }

    /// Id of the underlying credential record, regardless of ownership.
    pub fn record_id(&self) -> &str {
        &self.credential().id
    }

    pub fn credential(&self) -> &CredentialRecord {
        match self {
            UnifiedEntry::Owned(record) => record,
            UnifiedEntry::Shared(link) => &link.credential,
        }
    }

    pub fn title(&self) -> &str {
        &self.credential().title
    }

    pub fn username(&self) -> &str {
        &self.credential().username
    }

    pub fn secret(&self) -> &str {
        &self.credential().secret
    }

    pub fn category(&self) -> Category {
        self.credential().category
    }

    pub fn strength(&self) -> Strength {
        self.credential().strength
    }

    pub fn favorite(&self) -> bool {
        self.credential().favorite
    }

    pub fn last_used_at(&self) -> Option<DateTime<Utc>> {
        self.credential().last_used_at
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EntryView<'a> {
    id: &'a str,
    shared: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    shared_record_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    record_id: Option<&'a str>,
    title: &'a str,
    username: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    website: Option<&'a str>,
    category: Category,
    password_strength: Strength,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
    favorite: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_used_at: Option<DateTime<Utc>>,
}

/// Serializes as the flat record with `id` set to the effective id and a
/// `shared` tag. Shared entries also carry their `sharedRecordId` and the
/// underlying `recordId`.
impl Serialize for UnifiedEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let record = self.credential();
        EntryView {
            id: self.effective_id(),
            shared: self.is_shared(),
            shared_record_id: match self {
                UnifiedEntry::Shared(link) => Some(link.link_id.as_str()),
                UnifiedEntry::Owned(_) => None,
            },
            record_id: self.is_shared().then_some(record.id.as_str()),
            title: &record.title,
            username: &record.username,
            password: &record.secret,
            website: record.website.as_deref(),
            category: record.category,
            password_strength: record.strength,
            notes: record.notes.as_deref(),
            favorite: record.favorite,
            created_at: record.created_at,
            updated_at: record.updated_at,
            last_used_at: record.last_used_at,
        }
        .serialize(serializer)
    }
}

impl From<CredentialRecord> for UnifiedEntry {
    fn from(record: CredentialRecord) -> Self {
        UnifiedEntry::Owned(record)
    }
}

impl From<SharedCredentialLink> for UnifiedEntry {
    fn from(link: SharedCredentialLink) -> Self {
        UnifiedEntry::Shared(link)
    }
}
