use std::fs;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod chat;
pub mod history;
pub mod key;
pub mod models;
pub mod send;

use crate::chat::{ChatSession, Notice};
use crate::core::AppConfig;
use crate::storage::KvStore;

#[derive(Subcommand)]
enum Command {
    /// Start an interactive chat session (the default)
    Chat {
        /// Model to start the session with
        #[arg(long)]
        model: Option<String>,
    },
    /// Send a single message and print the reply
    Send {
        #[arg(long)]
        message: String,
        #[arg(long)]
        model: Option<String>,
    },
    /// List the models available to the stored API key
    Models {},
    /// Print the saved chat history
    History {
        /// Delete the saved history instead of printing it
        #[arg(long, action, default_value = "false")]
        clear: bool,
    },
    /// Show or set the stored API key
    Key {
        #[arg(long)]
        set: Option<String>,
        /// Print the key unmasked
        #[arg(long, action, default_value = "false")]
        show: bool,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Directory holding the local database
    #[arg(long, global = true)]
    storage_path: Option<String>,

    /// Base URL of the Gemini API
    #[arg(long, global = true)]
    api_host: Option<String>,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        // Keep stdout for the conversation itself
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Open the store under the configured storage path and load a
/// session from it. Notifications go to the returned receiver.
pub async fn open_session(
    config: &AppConfig,
) -> Result<(ChatSession, mpsc::UnboundedReceiver<Notice>)> {
    fs::create_dir_all(&config.storage_path)
        .with_context(|| format!("Failed to create storage dir {}", config.storage_path))?;
    let store = KvStore::open(&config.db_path)
        .await
        .with_context(|| format!("Failed to open database {}", config.db_path))?;

    let (tx, rx) = mpsc::unbounded_channel();
    let session = ChatSession::builder(&config.api_hostname, store)
        .model(&config.default_model)
        .fallback_api_key(config.env_api_key.clone())
        .notifications(tx)
        .build()
        .await;

    Ok((session, rx))
}

pub fn format_notice(notice: &Notice) -> String {
    if notice.destructive {
        format!("[!] {}: {}", notice.title, notice.description)
    } else {
        format!("[i] {}: {}", notice.title, notice.description)
    }
}

/// Print every notification received so far.
pub fn print_notices(rx: &mut mpsc::UnboundedReceiver<Notice>) {
    while let Ok(notice) = rx.try_recv() {
        println!("{}", format_notice(&notice));
    }
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    init_tracing();

    let mut config = AppConfig::default();
    if let Some(storage_path) = &args.storage_path {
        config = config.with_storage_path(storage_path);
    }
    if let Some(api_host) = &args.api_host {
        config = config.with_api_hostname(api_host);
    }

    // Handle each sub command
    match args.command {
        Some(Command::Chat { model }) => {
            if let Some(model) = model {
                config = config.with_default_model(&model);
            }
            chat::run(&config).await?;
        }
        Some(Command::Send { message, model }) => {
            if let Some(model) = model {
                config = config.with_default_model(&model);
            }
            send::run(&config, &message).await?;
        }
        Some(Command::Models {}) => {
            models::run(&config).await?;
        }
        Some(Command::History { clear }) => {
            history::run(&config, clear).await?;
        }
        Some(Command::Key { set, show }) => {
            key::run(&config, set, show).await?;
        }
        None => {
            chat::run(&config).await?;
        }
    }

    Ok(())
}
