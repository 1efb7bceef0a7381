use crate::api::PasswordCollections;
use crate::cache::CollaboratorCache;
use crate::models::{CredentialRecord, EntryKey, SharedCredentialLink, UnifiedEntry};

/// Everything the repository holds for one session epoch.
#[derive(Debug, Default)]
pub(crate) struct RepoState {
    pub epoch: u64,
    pub owned: Vec<CredentialRecord>,
    pub shared: Vec<SharedCredentialLink>,
    pub collaborators: CollaboratorCache,
}

impl RepoState {
    pub fn new(epoch: u64) -> Self {
        Self {
            epoch,
            ..Default::default()
        }
    }

    /// Drop everything and adopt a new session epoch.
    pub fn reset(&mut self, epoch: u64) {
        *self = Self::new(epoch);
    }

    pub fn replace(&mut self, collections: PasswordCollections) {
        self.owned = collections.owned;
        self.shared = collections.shared;
    }

    pub fn clear_collections(&mut self) {
        self.owned.clear();
        self.shared.clear();
    }

    /// The record an entry key addresses, in the collection its tag selects.
    pub fn record_mut(&mut self, key: &EntryKey) -> Option<&mut CredentialRecord> {
        if key.shared {
            self.shared
                .iter_mut()
                .find(|link| link.link_id == key.id)
                .map(|link| &mut link.credential)
        } else {
            self.owned.iter_mut().find(|record| record.id == key.id)
        }
    }

    pub fn entry(&self, key: &EntryKey) -> Option<UnifiedEntry> {
        if key.shared {
            self.shared
                .iter()
                .find(|link| link.link_id == key.id)
                .cloned()
                .map(UnifiedEntry::Shared)
        } else {
            self.owned
                .iter()
                .find(|record| record.id == key.id)
                .cloned()
                .map(UnifiedEntry::Owned)
        }
    }

    pub fn owns(&self, id: &str) -> bool {
        self.owned.iter().any(|record| record.id == id)
    }

    pub fn has_link(&self, link_id: &str) -> bool {
        self.shared.iter().any(|link| link.link_id == link_id)
    }

    /// Owned record ids whose collaborator list is not cached yet.
    pub fn uncached_owned_ids(&self) -> Vec<String> {
        self.owned
            .iter()
            .filter(|record| !self.collaborators.contains(&record.id))
            .map(|record| record.id.clone())
            .collect()
    }
}
