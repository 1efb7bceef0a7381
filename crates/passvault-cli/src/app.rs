//! Command handlers for the PassVault CLI.
//!
//! `App` wires the session store to the credential repository and runs one
//! command per process. Authenticated commands load the collections first.

use std::io::{self, Write};

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, warn};

use passvault_core::auth::CredentialStore;
use passvault_core::repository::view::{self, RECENTLY_USED_LIMIT};
use passvault_core::utils::{generate_password, DEFAULT_PASSWORD_LENGTH};
use passvault_core::{
    Config, CredentialRepository, CredentialUpdate, EntryKey, FetchOutcome, FileStorage,
    NewCredential, SecurityStats, SessionStore, UnifiedEntry, ViewFilter,
};

use crate::output;
use crate::{CopyField, FieldArgs};

pub struct App {
    config: Config,
    session: SessionStore,
    repo: CredentialRepository,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let api = config.api_client()?;
        let storage = FileStorage::new(Config::data_dir()?);
        let mut session = SessionStore::new(api, storage);
        session.restore();
        let repo = CredentialRepository::new(session.subscribe());
        Ok(Self { config, session, repo })
    }

    // ===== Session =====

    pub async fn login(&mut self, email: Option<String>, remember: bool) -> Result<()> {
        let email = match email {
            Some(email) => email,
            None => prompt_email(self.config.last_email.as_deref())?,
        };

        let password = match CredentialStore::get_password(&email) {
            Ok(Some(stored)) if confirm("Use stored password? [Y/n]: ", true)? => stored,
            Ok(_) => prompt_password("Password: ")?,
            Err(e) => {
                warn!(error = %e, "Keychain unavailable");
                prompt_password("Password: ")?
            }
        };

        let session = self
            .session
            .login(&email, &password)
            .await
            .map_err(|e| anyhow!(e.user_message()))?;

        if remember {
            if let Err(e) = CredentialStore::store(&email, &password) {
                warn!(error = %e, "Failed to store credentials");
            }
        }

        self.config.last_email = Some(email);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        println!("Logged in as {}", session.user.display_name());
        Ok(())
    }

    pub async fn register(&mut self, name: &str, email: &str) -> Result<()> {
        let password = prompt_password("Password: ")?;
        let confirmation = prompt_password("Confirm password: ")?;
        if password != confirmation {
            bail!("Passwords do not match");
        }

        self.session
            .register(name, email, &password)
            .await
            .map_err(|e| anyhow!(e.user_message()))?;

        println!("Account created. Run `passvault login {}` to sign in.", email.trim());
        Ok(())
    }

    pub fn logout(&mut self) {
        let was_logged_in = self.session.is_authenticated();
        self.session.logout();
        self.repo.clear();

        if let Some(ref email) = self.config.last_email {
            if let Err(e) = CredentialStore::delete(email) {
                warn!(error = %e, "Failed to delete stored credentials");
            }
        }

        if was_logged_in {
            println!("Logged out");
        } else {
            println!("Not logged in");
        }
    }

    pub fn status(&self) {
        match self.session.user() {
            Some(user) => println!("Logged in as {} <{}>", user.display_name(), user.email),
            None => println!("Not logged in"),
        }
        println!("Server: {}", self.config.api_base_url);
    }

    /// Make sure there is a session, re-using a remembered password when the
    /// persisted one is gone, then load both collections.
    async fn connect(&mut self) -> Result<()> {
        if !self.session.is_authenticated() {
            self.login_remembered().await?;
        }

        match self.repo.fetch_all().await {
            FetchOutcome::Synced { owned, shared } => {
                debug!(owned, shared, "Collections loaded");
                Ok(())
            }
            FetchOutcome::Failed => bail!("Could not load passwords from {}", self.config.api_base_url),
            FetchOutcome::Skipped | FetchOutcome::Stale => bail!("Session ended while loading passwords"),
        }
    }

    async fn login_remembered(&mut self) -> Result<()> {
        const NOT_LOGGED_IN: &str = "Not logged in. Run `passvault login` first.";

        let email = self.config.last_email.clone().ok_or_else(|| anyhow!(NOT_LOGGED_IN))?;
        let password = match CredentialStore::get_password(&email) {
            Ok(Some(password)) => password,
            Ok(None) => bail!(NOT_LOGGED_IN),
            Err(e) => {
                warn!(error = %e, "Keychain unavailable");
                bail!(NOT_LOGGED_IN);
            }
        };

        debug!(email = %email, "Logging in with remembered password");
        self.session
            .login(&email, &password)
            .await
            .map_err(|e| anyhow!("Automatic login failed: {}", e.user_message()))?;
        Ok(())
    }

    /// Owned entry with this id first, then any entry whose effective id
    /// matches. `shared` restricts the lookup to shared links.
    fn resolve(&self, id: &str, shared: bool) -> Result<UnifiedEntry> {
        let found = if shared {
            self.repo.entry(&EntryKey::shared(id))
        } else {
            self.repo
                .entry(&EntryKey::owned(id))
                .or_else(|| self.repo.find(id))
        };
        found.ok_or_else(|| anyhow!("No password with id {}", id))
    }

    // ===== Reading =====

    pub async fn list(&mut self, filter: ViewFilter, search: &str, json: bool) -> Result<()> {
        self.connect().await?;
        let entries = self.repo.unified_view();
        let selected = view::select(&entries, filter, search);

        if json {
            println!("{}", serde_json::to_string_pretty(&selected)?);
        } else if selected.is_empty() {
            println!("{}", filter.empty_message());
        } else {
            output::print_entries(&selected);
        }
        Ok(())
    }

    pub async fn recent(&mut self) -> Result<()> {
        self.connect().await?;
        let entries = self.repo.unified_view();
        let recent = view::recently_used(&entries, RECENTLY_USED_LIMIT);

        if recent.is_empty() {
            println!("No recently used passwords");
        } else {
            output::print_entries(&recent);
        }
        Ok(())
    }

    pub async fn stats(&mut self) -> Result<()> {
        self.connect().await?;
        let entries = self.repo.unified_view();
        output::print_stats(&SecurityStats::from_entries(&entries));
        Ok(())
    }

    pub async fn show(&mut self, id: &str, shared: bool, reveal: bool) -> Result<()> {
        self.connect().await?;
        let entry = self.resolve(id, shared)?;
        output::print_entry(&entry, reveal);

        if reveal {
            self.mark_used(&entry).await;
        }
        Ok(())
    }

    pub async fn copy(&mut self, id: &str, shared: bool, field: CopyField) -> Result<()> {
        self.connect().await?;
        let entry = self.resolve(id, shared)?;

        let value = match field {
            CopyField::Password => entry.secret(),
            CopyField::Username => entry.username(),
        };
        print!("{}", value);
        io::stdout().flush()?;

        self.mark_used(&entry).await;
        Ok(())
    }

    /// Usage stamps are best effort; a failure only shows up in the log.
    async fn mark_used(&self, entry: &UnifiedEntry) {
        if let Err(e) = self.repo.mark_used(entry).await {
            warn!(id = entry.effective_id(), error = %e, "Failed to record use");
        }
    }

    // ===== Mutations =====

    pub async fn add(&mut self, title: String, username: String, fields: FieldArgs, generate: bool) -> Result<()> {
        self.connect().await?;

        let secret = if generate {
            generate_password(DEFAULT_PASSWORD_LENGTH)
        } else {
            prompt_password("Password: ")?
        };

        let mut new = NewCredential::new(title, username, secret);
        new.website = fields.website;
        new.category = fields.category.unwrap_or_default();
        new.strength = fields.strength.unwrap_or_default();
        new.notes = fields.notes;
        new.favorite = fields.favorite;

        let created = self.repo.add(new).await.map_err(|e| anyhow!(e.user_message()))?;
        println!("Added \"{}\" ({})", created.title, created.id);
        if generate {
            println!("Generated password: {}", created.secret);
        }
        Ok(())
    }

    pub async fn edit(
        &mut self,
        id: &str,
        title: Option<String>,
        username: Option<String>,
        fields: FieldArgs,
        password: bool,
        generate: bool,
    ) -> Result<()> {
        self.connect().await?;

        let secret = if generate {
            Some(generate_password(DEFAULT_PASSWORD_LENGTH))
        } else if password {
            Some(prompt_password("New password: ")?)
        } else {
            None
        };

        let updates = CredentialUpdate {
            title,
            username,
            secret: secret.clone(),
            website: fields.website,
            category: fields.category,
            strength: fields.strength,
            notes: fields.notes,
            favorite: fields.favorite.then_some(true),
        };
        if updates.is_empty() {
            bail!("Nothing to change");
        }

        self.repo.edit(id, updates).await.map_err(|e| anyhow!(e.user_message()))?;
        println!("Updated {}", id);
        if let (true, Some(secret)) = (generate, secret) {
            println!("Generated password: {}", secret);
        }
        Ok(())
    }

    pub async fn delete(&mut self, id: &str, yes: bool) -> Result<()> {
        self.connect().await?;
        let entry = self.resolve(id, false)?;
        if entry.is_shared() {
            bail!("\"{}\" is shared with you. Use `passvault unshare {}` instead.", entry.title(), id);
        }

        if !yes && !confirm(&format!("Delete \"{}\"? [y/N]: ", entry.title()), false)? {
            println!("Cancelled");
            return Ok(());
        }

        self.repo.delete(id).await.map_err(|e| anyhow!(e.user_message()))?;
        println!("Deleted \"{}\"", entry.title());
        Ok(())
    }

    pub async fn favorite(&mut self, id: &str, shared: bool) -> Result<()> {
        self.connect().await?;
        let entry = self.resolve(id, shared)?;

        self.repo
            .toggle_favorite(&entry)
            .await
            .map_err(|e| anyhow!(e.user_message()))?;

        let now = self
            .repo
            .entry(&entry.key())
            .map(|e| e.favorite())
            .unwrap_or(!entry.favorite());
        if now {
            println!("Added \"{}\" to favorites", entry.title());
        } else {
            println!("Removed \"{}\" from favorites", entry.title());
        }
        Ok(())
    }

    pub async fn share(&mut self, id: &str, emails: &[String]) -> Result<()> {
        self.connect().await?;

        let outcome = self.repo.share(id, emails).await.map_err(|e| anyhow!(e.user_message()))?;
        if outcome.is_empty() {
            bail!("No email addresses given");
        }
        output::print_share_outcome(&outcome);

        let failed = outcome.failed_emails();
        if !failed.is_empty() {
            println!();
            println!("Retry the failed recipients with:");
            println!("  passvault share {} {}", id, failed.join(" "));
        }
        Ok(())
    }

    pub async fn unshare(&mut self, id: &str) -> Result<()> {
        self.connect().await?;
        let entry = self
            .repo
            .entry(&EntryKey::shared(id))
            .ok_or_else(|| anyhow!("No shared password with id {}", id))?;

        self.repo.unshare(&entry).await.map_err(|e| anyhow!(e.user_message()))?;
        println!("Removed \"{}\" from your shared passwords", entry.title());
        Ok(())
    }

    pub async fn collaborators(&mut self, id: &str) -> Result<()> {
        self.connect().await?;
        let entry = self.resolve(id, false)?;
        if entry.is_shared() {
            bail!("Only the owner can see who \"{}\" is shared with", entry.title());
        }

        let collaborators = self.repo.collaborators_of(id).await;
        if collaborators.is_empty() {
            println!("\"{}\" is not shared with anyone", entry.title());
        } else {
            output::print_collaborators(&collaborators);
        }
        Ok(())
    }
}

// ============================================================================
// Prompts
// ============================================================================

fn prompt_password(prompt: &str) -> Result<String> {
    let password = rpassword::prompt_password(prompt).context("Failed to read password")?;
    Ok(password)
}

fn prompt_email(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Email [{}]: ", last),
        None => print!("Email: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    match (input.is_empty(), last) {
        (false, _) => Ok(input.to_string()),
        (true, Some(last)) => Ok(last.to_string()),
        (true, None) => bail!("Email is required"),
    }
}

fn confirm(prompt: &str, default: bool) -> Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(match input.trim().to_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    })
}
