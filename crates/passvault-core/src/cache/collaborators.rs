use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::CollaboratorEntry;

#[derive(Debug, Clone)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

/// Collaborator lists keyed by owning record id.
///
/// Entries are filled lazily on first lookup and dropped whenever the
/// sharing set of that record changes. There is no time-based expiry.
/// Each invalidation bumps a per-record generation, and `clear` bumps a
/// cache-wide one, so that a lookup which started before the change cannot
/// store its outdated answer.
#[derive(Debug, Default)]
pub struct CollaboratorCache {
    entries: HashMap<String, CachedData<Vec<CollaboratorEntry>>>,
    generations: HashMap<String, u64>,
    clears: u64,
}

impl CollaboratorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, record_id: &str) -> Option<&CachedData<Vec<CollaboratorEntry>>> {
        self.entries.get(record_id)
    }

    pub fn insert(&mut self, record_id: &str, collaborators: Vec<CollaboratorEntry>) {
        self.entries
            .insert(record_id.to_string(), CachedData::new(collaborators));
    }

    /// Strictly increases whenever `record_id` is invalidated or the whole
    /// cache is cleared.
    pub fn generation(&self, record_id: &str) -> u64 {
        self.clears + self.generations.get(record_id).copied().unwrap_or(0)
    }

    /// Insert only if the record was not invalidated since `generation`
    /// was read. Returns whether the value was stored.
    pub fn insert_if_current(
        &mut self,
        record_id: &str,
        generation: u64,
        collaborators: Vec<CollaboratorEntry>,
    ) -> bool {
        if self.generation(record_id) != generation {
            return false;
        }
        self.insert(record_id, collaborators);
        true
    }

    /// Returns true if an entry was present.
    pub fn invalidate(&mut self, record_id: &str) -> bool {
        *self.generations.entry(record_id.to_string()).or_insert(0) += 1;
        self.entries.remove(record_id).is_some()
    }

    pub fn contains(&self, record_id: &str) -> bool {
        self.entries.contains_key(record_id)
    }

    pub fn clear(&mut self) {
        self.clears += 1;
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
