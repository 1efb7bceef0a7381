//! Pure derivations over the owned and shared collections: the unified
//! view, filters, search, recently used entries and strength statistics.

use std::fmt;
use std::str::FromStr;

use crate::models::{Category, CredentialRecord, SharedCredentialLink, Strength, UnifiedEntry, ValidationError};
use crate::utils::contains_ignore_case;

/// Entries shown in the dashboard's "recently used" panel.
pub const RECENTLY_USED_LIMIT: usize = 3;

/// Merge owned and shared collections into one list, most recently used
/// first. Entries never used sort last; ties keep owned before shared.
/// Both inputs are left untouched.
pub fn unify(owned: &[CredentialRecord], shared: &[SharedCredentialLink]) -> Vec<UnifiedEntry> {
    let mut entries: Vec<UnifiedEntry> = owned
        .iter()
        .cloned()
        .map(UnifiedEntry::Owned)
        .chain(shared.iter().cloned().map(UnifiedEntry::Shared))
        .collect();
    // None < Some, so reversing the comparison puts unused entries last.
    entries.sort_by(|a, b| b.last_used_at().cmp(&a.last_used_at()));
    entries
}

/// Navigation filter over the unified view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewFilter {
    #[default]
    All,
    Favorites,
    Shared,
    Category(Category),
}

impl ViewFilter {
    pub fn matches(&self, entry: &UnifiedEntry) -> bool {
        match self {
            ViewFilter::All => true,
            ViewFilter::Favorites => entry.favorite(),
            ViewFilter::Shared => entry.is_shared(),
            ViewFilter::Category(category) => entry.category() == *category,
        }
    }

    /// Text shown when the filter leaves nothing to display.
    pub fn empty_message(&self) -> String {
        match self {
            ViewFilter::All => "No passwords available".to_string(),
            ViewFilter::Favorites => "No favorite passwords".to_string(),
            ViewFilter::Shared => "No shared passwords".to_string(),
            ViewFilter::Category(category) => format!("No {} passwords", category),
        }
    }
}

impl fmt::Display for ViewFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewFilter::All => write!(f, "all"),
            ViewFilter::Favorites => write!(f, "favorites"),
            ViewFilter::Shared => write!(f, "shared"),
            ViewFilter::Category(category) => write!(f, "{}", category.slug()),
        }
    }
}

impl FromStr for ViewFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(ViewFilter::All),
            "favorites" | "favorite" => Ok(ViewFilter::Favorites),
            "shared" => Ok(ViewFilter::Shared),
            other => other.parse().map(ViewFilter::Category),
        }
    }
}

/// Case-insensitive match on title or category. A blank query matches all.
pub fn matches_query(entry: &UnifiedEntry, query: &str) -> bool {
    let query = query.trim();
    query.is_empty()
        || contains_ignore_case(entry.title(), query)
        || contains_ignore_case(entry.category().title(), query)
}

/// Filter then search, preserving the view's order.
pub fn select<'a>(entries: &'a [UnifiedEntry], filter: ViewFilter, query: &str) -> Vec<&'a UnifiedEntry> {
    entries
        .iter()
        .filter(|e| filter.matches(e) && matches_query(e, query))
        .collect()
}

/// Entries that have been used, most recent first, at most `limit`.
pub fn recently_used(entries: &[UnifiedEntry], limit: usize) -> Vec<&UnifiedEntry> {
    let mut used: Vec<&UnifiedEntry> = entries.iter().filter(|e| e.last_used_at().is_some()).collect();
    used.sort_by(|a, b| b.last_used_at().cmp(&a.last_used_at()));
    used.truncate(limit);
    used
}

/// Strength distribution across a set of entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecurityStats {
    pub weak: usize,
    pub good: usize,
    pub strong: usize,
}

impl SecurityStats {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a UnifiedEntry>) -> Self {
        entries.into_iter().fold(Self::default(), |mut acc, entry| {
            match entry.strength() {
                Strength::Weak => acc.weak += 1,
                Strength::Good => acc.good += 1,
                Strength::Strong => acc.strong += 1,
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.weak + self.good + self.strong
    }

    pub fn count(&self, strength: Strength) -> usize {
        match strength {
            Strength::Weak => self.weak,
            Strength::Good => self.good,
            Strength::Strong => self.strong,
        }
    }

    /// Share of entries with the given strength, 0-100. Empty sets give 0.
    pub fn percent(&self, strength: Strength) -> f64 {
        let total = self.total().max(1);
        self.count(strength) as f64 * 100.0 / total as f64
    }
}
