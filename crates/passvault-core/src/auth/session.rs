use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::models::{validation, User};

use super::error::AuthError;
use super::storage::{SessionStorage, TOKEN_KEY, USER_KEY};

/// An authenticated session. Token and user only ever exist together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// What the rest of the client sees of the session: a monotonically
/// increasing epoch and, while authenticated, an `ApiClient` carrying the
/// bearer token. The session store is the only writer.
#[derive(Debug, Clone)]
pub struct SessionBinding {
    pub epoch: u64,
    pub client: Option<ApiClient>,
}

impl SessionBinding {
    pub fn is_authenticated(&self) -> bool {
        self.client.is_some()
    }
}

/// Holds the authentication state and persists it across runs.
pub struct SessionStore {
    api: ApiClient,
    storage: Box<dyn SessionStorage>,
    current: Option<Session>,
    epoch: u64,
    binding: watch::Sender<SessionBinding>,
}

impl SessionStore {
    /// `api` is used unauthenticated for login/registration and as the
    /// template for token-bound clients.
    pub fn new(api: ApiClient, storage: impl SessionStorage + 'static) -> Self {
        let api = api.without_token();
        let (binding, _) = watch::channel(SessionBinding { epoch: 0, client: None });
        Self {
            api,
            storage: Box::new(storage),
            current: None,
            epoch: 0,
            binding,
        }
    }

    /// Load a previously persisted session. Anything unreadable or
    /// incomplete is purged and the store stays logged out.
    pub fn restore(&mut self) -> bool {
        match self.load_persisted() {
            Ok(Some(session)) => {
                info!(user = %session.user.email, "Restored session");
                self.activate(session);
                true
            }
            Ok(None) => {
                debug!("No persisted session found");
                self.deactivate();
                false
            }
            Err(e) => {
                warn!(error = %e, "Failed to restore session, purging persisted state");
                self.purge_storage();
                self.deactivate();
                false
            }
        }
    }

    /// Exchange credentials for a session. On any failure the store is left
    /// fully logged out and the error is returned.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Session, AuthError> {
        match self.request_login(email, password).await {
            Ok(session) => {
                if let Err(e) = self.persist(&session) {
                    // Never leave half a session on disk
                    warn!(error = %e, "Failed to save session");
                    self.purge_storage();
                }
                info!(user = %session.user.email, "Logged in");
                self.activate(session.clone());
                Ok(session)
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.purge_storage();
                self.deactivate();
                Err(e)
            }
        }
    }

    async fn request_login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        validation::login_form(email, password)?;
        let response = self.api.login(email.trim(), password).await?;
        if response.token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }
        Ok(Session {
            token: response.token,
            user: response.user,
        })
    }

    /// Create an account. The store's state is not touched.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), AuthError> {
        validation::registration_form(name, email, password)?;
        self.api.register(name.trim(), email.trim(), password).await?;
        info!(email = %email.trim(), "Registered account");
        Ok(())
    }

    /// Clear in-memory and persisted state. Calling it while logged out
    /// does nothing observable.
    pub fn logout(&mut self) {
        self.purge_storage();
        if self.current.is_some() {
            info!("Logged out");
            self.deactivate();
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.token.as_str())
    }

    pub fn user(&self) -> Option<&User> {
        self.current.as_ref().map(|s| &s.user)
    }

    /// Receiver that observes every session change.
    pub fn subscribe(&self) -> watch::Receiver<SessionBinding> {
        self.binding.subscribe()
    }

    pub fn binding(&self) -> SessionBinding {
        self.binding.borrow().clone()
    }

    fn activate(&mut self, session: Session) {
        let client = self.api.with_token(session.token.clone());
        self.current = Some(session);
        self.publish(Some(client));
    }

    fn deactivate(&mut self) {
        self.current = None;
        self.publish(None);
    }

    fn publish(&mut self, client: Option<ApiClient>) {
        self.epoch += 1;
        debug!(epoch = self.epoch, authenticated = client.is_some(), "Session binding changed");
        self.binding.send_replace(SessionBinding {
            epoch: self.epoch,
            client,
        });
    }

    fn load_persisted(&self) -> Result<Option<Session>> {
        let token = self.storage.load(TOKEN_KEY)?;
        let user = self.storage.load(USER_KEY)?;
        match (token, user) {
            (None, None) => Ok(None),
            (Some(token), Some(user)) if !token.trim().is_empty() => {
                let user: User = serde_json::from_str(&user).context("Failed to parse persisted user")?;
                Ok(Some(Session { token, user }))
            }
            _ => anyhow::bail!("Persisted session is incomplete"),
        }
    }

    fn persist(&self, session: &Session) -> Result<()> {
        let user = serde_json::to_string(&session.user)?;
        self.storage.save(TOKEN_KEY, &session.token)?;
        self.storage.save(USER_KEY, &user)?;
        Ok(())
    }

    fn purge_storage(&self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "Failed to remove persisted session value");
            }
        }
    }
}
