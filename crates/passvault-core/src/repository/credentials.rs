//! Credential repository: the owned and shared collections of the logged-in
//! user, kept in sync with the backend.
//!
//! Mutations of favorite and last-used state are applied locally first and
//! then confirmed with the server. Every server-confirmed change to the
//! collections is followed by a full re-fetch; a failed optimistic change is
//! rolled back immediately and then re-fetched as well.
//!
//! Results are tied to the session epoch they started in. Anything that
//! completes after a logout or re-login is discarded.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::client::ApiResult;
use crate::api::ApiClient;
use crate::auth::SessionBinding;
use crate::cache::CachedData;
use crate::models::{
    CollaboratorEntry, CredentialRecord, CredentialUpdate, EntryKey, NewCredential, ShareOutcome,
    UnifiedEntry,
};

use super::error::RepositoryError;
use super::state::RepoState;
use super::view;

/// Maximum concurrent collaborator lookups when warming the cache.
const MAX_CONCURRENT_REQUESTS: usize = 10;

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// What a `fetch_all` did. Failures are reported here, never as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Both collections replaced with server data
    Synced { owned: usize, shared: usize },
    /// Request failed; both collections are now empty
    Failed,
    /// Not logged in; nothing requested
    Skipped,
    /// Session changed while the request was in flight; result discarded
    Stale,
}

impl FetchOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, FetchOutcome::Synced { .. })
    }
}

/// Clone is cheap; clones share the same state.
#[derive(Clone)]
pub struct CredentialRepository {
    session: watch::Receiver<SessionBinding>,
    state: Arc<Mutex<RepoState>>,
}

impl CredentialRepository {
    pub fn new(session: watch::Receiver<SessionBinding>) -> Self {
        let epoch = session.borrow().epoch;
        Self {
            session,
            state: Arc::new(Mutex::new(RepoState::new(epoch))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RepoState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current epoch and token-bound client.
    fn authorized(&self) -> Result<(u64, ApiClient)> {
        let binding = self.session.borrow();
        match binding.client {
            Some(ref client) => Ok((binding.epoch, client.clone())),
            None => Err(RepositoryError::NotAuthenticated),
        }
    }

    /// Run `f` against state belonging to the live session. State left over
    /// from an earlier epoch is dropped first.
    fn with_state<R>(&self, f: impl FnOnce(&mut RepoState) -> R) -> R {
        let binding = self.session.borrow();
        let mut state = self.lock();
        if state.epoch != binding.epoch {
            debug!(from = state.epoch, to = binding.epoch, "Session changed, dropping repository state");
            state.reset(binding.epoch);
        }
        f(&mut state)
    }

    /// Run `f` only if `epoch` is still the live session.
    fn with_epoch<R>(&self, epoch: u64, f: impl FnOnce(&mut RepoState) -> R) -> Option<R> {
        let binding = self.session.borrow();
        if binding.epoch != epoch {
            debug!(epoch, current = binding.epoch, "Discarding result from an earlier session");
            return None;
        }
        let mut state = self.lock();
        if state.epoch != epoch {
            state.reset(epoch);
        }
        Some(f(&mut state))
    }

    // ===== Reads =====

    /// Owned and shared entries merged, most recently used first.
    pub fn unified_view(&self) -> Vec<UnifiedEntry> {
        self.with_state(|state| view::unify(&state.owned, &state.shared))
    }

    pub fn entry(&self, key: &EntryKey) -> Option<UnifiedEntry> {
        self.with_state(|state| state.entry(key))
    }

    /// First entry in view order whose effective id matches. Owned records
    /// and shared links can share an id; use `entry` to pick one exactly.
    pub fn find(&self, id: &str) -> Option<UnifiedEntry> {
        self.unified_view().into_iter().find(|e| e.effective_id() == id)
    }

    pub fn owned_len(&self) -> usize {
        self.with_state(|state| state.owned.len())
    }

    pub fn shared_len(&self) -> usize {
        self.with_state(|state| state.shared.len())
    }

    pub fn is_empty(&self) -> bool {
        self.with_state(|state| state.owned.is_empty() && state.shared.is_empty())
    }

    /// Drop both collections and the collaborator cache.
    pub fn clear(&self) {
        self.with_state(|state| {
            state.clear_collections();
            state.collaborators.clear();
        });
    }

    // ===== Sync =====

    /// Replace both collections with the server's. On failure both become
    /// empty rather than keeping stale data; the error is logged only.
    pub async fn fetch_all(&self) -> FetchOutcome {
        let (epoch, client) = match self.authorized() {
            Ok(pair) => pair,
            Err(_) => {
                debug!("Not logged in, skipping fetch");
                self.clear();
                return FetchOutcome::Skipped;
            }
        };

        match client.fetch_passwords().await {
            Ok(collections) => {
                let owned = collections.owned.len();
                let shared = collections.shared.len();
                match self.with_epoch(epoch, |state| state.replace(collections)) {
                    Some(()) => {
                        debug!(owned, shared, "Fetched passwords");
                        FetchOutcome::Synced { owned, shared }
                    }
                    None => FetchOutcome::Stale,
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch passwords");
                match self.with_epoch(epoch, RepoState::clear_collections) {
                    Some(()) => FetchOutcome::Failed,
                    None => FetchOutcome::Stale,
                }
            }
        }
    }

    /// Keep the repository in step with the session: fetch whenever it
    /// becomes authenticated, clear whenever it ends. Returns once the
    /// session store is dropped.
    pub async fn follow_session(self) {
        let mut rx = self.session.clone();
        loop {
            let authenticated = rx.borrow_and_update().is_authenticated();
            if authenticated {
                self.fetch_all().await;
            } else {
                self.clear();
            }
            if rx.changed().await.is_err() {
                debug!("Session store dropped, no longer following");
                break;
            }
        }
    }

    // ===== Mutations =====

    /// Apply `mutate` to the addressed record right away, then run `remote`.
    /// Success re-fetches; failure restores the previous record, re-fetches
    /// and returns the error.
    async fn apply_optimistic<M, R, Fut>(&self, key: EntryKey, mutate: M, remote: R) -> Result<()>
    where
        M: FnOnce(&mut CredentialRecord),
        R: FnOnce(ApiClient) -> Fut,
        Fut: Future<Output = ApiResult<()>>,
    {
        let (epoch, client) = self.authorized()?;

        let snapshot = self
            .with_epoch(epoch, |state| {
                let record = state.record_mut(&key)?;
                let before = record.clone();
                mutate(record);
                Some(before)
            })
            .flatten()
            .ok_or_else(|| RepositoryError::NotFound(key.id.clone()))?;

        match remote(client).await {
            Ok(()) => {
                self.fetch_all().await;
                Ok(())
            }
            Err(e) => {
                warn!(id = %key.id, shared = key.shared, error = %e, "Update failed, rolling back");
                self.with_epoch(epoch, |state| {
                    if let Some(record) = state.record_mut(&key) {
                        *record = snapshot;
                    }
                });
                self.fetch_all().await;
                Err(e.into())
            }
        }
    }

    /// Flip the favorite flag of an owned record or of the caller's own
    /// shared link.
    pub async fn toggle_favorite(&self, entry: &UnifiedEntry) -> Result<()> {
        let key = entry.key();
        let (id, shared) = (key.id.clone(), key.shared);
        self.apply_optimistic(
            key,
            |record| record.favorite = !record.favorite,
            move |client| async move { client.toggle_favorite(&id, shared).await },
        )
        .await
    }

    /// Stamp the entry as used now. Called after every reveal or copy.
    pub async fn mark_used(&self, entry: &UnifiedEntry) -> Result<()> {
        let key = entry.key();
        let (id, shared) = (key.id.clone(), key.shared);
        let now = Utc::now();
        self.apply_optimistic(
            key,
            move |record| record.last_used_at = Some(now),
            move |client| async move { client.mark_used(&id, shared).await },
        )
        .await
    }

    /// Create an owned record. Local state changes only through the
    /// re-fetch that follows a successful request.
    pub async fn add(&self, new: NewCredential) -> Result<CredentialRecord> {
        new.validate()?;
        let (_, client) = self.authorized()?;

        let created = client.create_password(&new).await.map_err(|e| {
            warn!(error = %e, "Failed to add password");
            RepositoryError::from(e)
        })?;
        info!(id = %created.id, "Added password");

        self.fetch_all().await;
        Ok(created)
    }

    /// Update an owned record. State is re-fetched whether or not the
    /// request succeeded.
    pub async fn edit(&self, id: &str, updates: CredentialUpdate) -> Result<()> {
        updates.validate()?;
        let (_, client) = self.authorized()?;
        self.ensure_owned(id)?;

        let result = client.update_password(id, &updates).await;
        if let Err(ref e) = result {
            warn!(id, error = %e, "Failed to update password");
        }
        self.fetch_all().await;
        result.map_err(Into::into)
    }

    /// Delete an owned record. Shared links are removed with `unshare`.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let (epoch, client) = self.authorized()?;
        self.ensure_owned(id)?;

        let result = client.delete_password(id).await;
        match result {
            Ok(()) => {
                info!(id, "Deleted password");
                self.with_epoch(epoch, |state| state.collaborators.invalidate(id));
            }
            Err(ref e) => warn!(id, error = %e, "Failed to delete password"),
        }
        self.fetch_all().await;
        result.map_err(Into::into)
    }

    /// Remove the caller's own grant to a shared record. The owner's record
    /// is untouched.
    pub async fn unshare(&self, entry: &UnifiedEntry) -> Result<()> {
        let UnifiedEntry::Shared(link) = entry else {
            return Err(RepositoryError::NotShared(entry.effective_id().to_string()));
        };
        let (epoch, client) = self.authorized()?;

        let result = client.remove_shared(&link.link_id).await;
        self.with_epoch(epoch, |state| state.collaborators.invalidate(&link.credential.id));
        match result {
            Ok(()) => info!(link_id = %link.link_id, "Removed shared password"),
            Err(ref e) => warn!(link_id = %link.link_id, error = %e, "Failed to remove shared password"),
        }
        self.fetch_all().await;
        result.map_err(Into::into)
    }

    // ===== Sharing =====

    /// Share an owned record with several recipients in one request.
    ///
    /// Per-recipient failures (unknown user, already shared) are part of the
    /// returned outcome, not an error. Blank addresses are dropped; if none
    /// remain no request is made.
    pub async fn share<S: AsRef<str>>(&self, id: &str, emails: &[S]) -> Result<ShareOutcome> {
        let emails: Vec<String> = emails
            .iter()
            .map(|e| e.as_ref().trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
        if emails.is_empty() {
            return Ok(ShareOutcome::default());
        }

        let (epoch, client) = self.authorized()?;
        self.ensure_owned(id)?;

        let result = client.share_password(id, &emails).await;
        self.with_epoch(epoch, |state| state.collaborators.invalidate(id));

        let outcome = result.map_err(|e| {
            warn!(id, error = %e, "Failed to share password");
            RepositoryError::from(e)
        })?;
        let failed = outcome.failed().count();
        if failed > 0 {
            warn!(id, failed, total = outcome.results.len(), "Some recipients could not be added");
        } else {
            info!(id, total = outcome.results.len(), "Shared password");
        }
        Ok(outcome)
    }

    /// Collaborators of an owned record, from cache when possible. Lookup
    /// failures are logged and yield an empty list, which is not cached.
    pub async fn collaborators_of(&self, id: &str) -> Vec<CollaboratorEntry> {
        let Ok((epoch, client)) = self.authorized() else {
            return Vec::new();
        };

        let lookup = self.with_epoch(epoch, |state| {
            match state.collaborators.get(id) {
                Some(cached) => Ok(cached.data.clone()),
                None => Err(state.collaborators.generation(id)),
            }
        });
        let generation = match lookup {
            Some(Ok(hit)) => {
                debug!(id, "Collaborator cache hit");
                return hit;
            }
            Some(Err(generation)) => generation,
            None => return Vec::new(),
        };

        match client.fetch_shared_users(id).await {
            Ok(collaborators) => {
                self.with_epoch(epoch, |state| {
                    state
                        .collaborators
                        .insert_if_current(id, generation, collaborators.clone())
                });
                collaborators
            }
            Err(e) => {
                warn!(id, error = %e, "Failed to fetch collaborators");
                Vec::new()
            }
        }
    }

    /// Cached collaborator list with its age, without fetching.
    pub fn cached_collaborators(&self, id: &str) -> Option<CachedData<Vec<CollaboratorEntry>>> {
        self.with_state(|state| state.collaborators.get(id).cloned())
    }

    /// Load collaborator lists for every owned record not cached yet.
    /// Returns how many lists were requested.
    pub async fn prefetch_collaborators(&self) -> usize {
        let ids = self.with_state(|state| state.uncached_owned_ids());
        let requested = ids.len();

        stream::iter(ids)
            .map(|id| {
                let repo = self.clone();
                async move { repo.collaborators_of(&id).await }
            })
            .buffer_unordered(MAX_CONCURRENT_REQUESTS)
            .for_each(|_| async {})
            .await;

        debug!(requested, "Prefetched collaborators");
        requested
    }

    fn ensure_owned(&self, id: &str) -> Result<()> {
        self.with_state(|state| {
            if state.owns(id) {
                Ok(())
            } else if state.has_link(id) {
                Err(RepositoryError::NotOwned(id.to_string()))
            } else {
                Err(RepositoryError::NotFound(id.to_string()))
            }
        })
    }
}
