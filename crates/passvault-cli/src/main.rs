//! PassVault CLI - a command-line client for personal and shared passwords.
//!
//! Every command runs against the PassVault backend configured in
//! `~/.config/passvault/config.json` (or `PASSVAULT_API_URL`). The session
//! token is persisted in the data directory between runs.

mod app;
mod output;

use std::io;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use passvault_core::utils::DEFAULT_PASSWORD_LENGTH;
use passvault_core::{Category, Config, Strength, ViewFilter};

use app::App;

/// Log file name prefix inside the data directory
const LOG_FILE_PREFIX: &str = "passvault.log";

#[derive(Parser)]
#[command(name = "passvault", version, about = "Manage personal and shared passwords")]
struct Cli {
    /// Backend base URL, overriding config and PASSVAULT_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Also write logs to a daily rolling file in the data directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and keep the session for later commands
    Login {
        email: Option<String>,
        /// Store the password in the OS keychain for automatic re-login
        #[arg(long)]
        remember: bool,
    },
    /// Create a new account
    Register { name: String, email: String },
    /// End the session and forget any remembered password
    Logout,
    /// Show who is logged in and which backend is used
    Status,
    /// List passwords, most recently used first
    List {
        /// all, favorites, shared or a category (e.g. social-media)
        #[arg(long, short)]
        filter: Option<ViewFilter>,
        /// Match title or category, ignoring case
        #[arg(long, short)]
        search: Option<String>,
        /// Print JSON, secrets included
        #[arg(long)]
        json: bool,
    },
    /// Show the most recently used passwords
    Recent,
    /// Show the password strength distribution
    Stats,
    /// Show the details of one password
    Show {
        #[command(flatten)]
        target: EntryTarget,
        /// Print the secret too (counts as a use)
        #[arg(long)]
        reveal: bool,
    },
    /// Write a field to stdout for piping into a clipboard tool
    Copy {
        #[command(flatten)]
        target: EntryTarget,
        #[arg(long, value_enum, default_value_t = CopyField::Password)]
        field: CopyField,
    },
    /// Add a password
    Add {
        title: String,
        username: String,
        #[command(flatten)]
        fields: FieldArgs,
        /// Generate the secret instead of prompting for it
        #[arg(long)]
        generate: bool,
    },
    /// Change fields of one of your passwords
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[command(flatten)]
        fields: FieldArgs,
        /// Prompt for a new secret
        #[arg(long, conflicts_with = "generate")]
        password: bool,
        /// Replace the secret with a generated one
        #[arg(long)]
        generate: bool,
    },
    /// Delete one of your passwords
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Toggle the favorite flag
    Favorite {
        #[command(flatten)]
        target: EntryTarget,
    },
    /// Share one of your passwords with other users
    Share {
        id: String,
        #[arg(required = true)]
        emails: Vec<String>,
    },
    /// Remove a password someone shared with you
    Unshare { id: String },
    /// List the users one of your passwords is shared with
    Collaborators { id: String },
    /// Print a random password
    Generate {
        #[arg(long, short, default_value_t = DEFAULT_PASSWORD_LENGTH)]
        length: usize,
    },
}

/// Addresses an entry by the id shown in `list`.
#[derive(Args)]
struct EntryTarget {
    id: String,
    /// The id is a shared link, not one of your own passwords
    #[arg(long)]
    shared: bool,
}

/// Optional record fields shared by `add` and `edit`.
#[derive(Args)]
struct FieldArgs {
    #[arg(long)]
    website: Option<String>,
    #[arg(long)]
    category: Option<Category>,
    #[arg(long)]
    strength: Option<Strength>,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long)]
    favorite: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum CopyField {
    Password,
    Username,
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_file: bool) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file.then(Config::data_dir) {
        Some(Ok(dir)) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        Some(Err(e)) => {
            eprintln!("Warning: file logging disabled: {}", e);
            (None, None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let guard = init_tracing(cli.log_file);
    info!("PassVault CLI starting");

    let result = run(cli).await;
    // Flush the file writer before a possible exit
    drop(guard);

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }

    // Needs neither backend nor session
    if let Command::Generate { length } = cli.command {
        println!("{}", passvault_core::utils::generate_password(length));
        return Ok(());
    }

    let mut app = App::new(config)?;

    match cli.command {
        Command::Login { email, remember } => app.login(email, remember).await,
        Command::Register { name, email } => app.register(&name, &email).await,
        Command::Logout => {
            app.logout();
            Ok(())
        }
        Command::Status => {
            app.status();
            Ok(())
        }
        Command::List { filter, search, json } => {
            app.list(filter.unwrap_or_default(), search.as_deref().unwrap_or(""), json)
                .await
        }
        Command::Recent => app.recent().await,
        Command::Stats => app.stats().await,
        Command::Show { target, reveal } => app.show(&target.id, target.shared, reveal).await,
        Command::Copy { target, field } => app.copy(&target.id, target.shared, field).await,
        Command::Add { title, username, fields, generate } => {
            app.add(title, username, fields, generate).await
        }
        Command::Edit {
            id,
            title,
            username,
            fields,
            password,
            generate,
        } => app.edit(&id, title, username, fields, password, generate).await,
        Command::Delete { id, yes } => app.delete(&id, yes).await,
        Command::Favorite { target } => app.favorite(&target.id, target.shared).await,
        Command::Share { id, emails } => app.share(&id, &emails).await,
        Command::Unshare { id } => app.unshare(&id).await,
        Command::Collaborators { id } => app.collaborators(&id).await,
        Command::Generate { .. } => Ok(()),
    }
}
