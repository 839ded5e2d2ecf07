//! Todolist - todo list file keeper.
//!
//! This binary is a terminal host for the list: it shows, saves and switches
//! the active list file, and can stay running to report changes made by other
//! programs.
//!
//! # Commands
//!
//! - `todolist watch`: Print the list every time it changes on disk
//! - `todolist show`: Print the list
//! - `todolist save <CONTENT>`: Replace the list
//! - `todolist save-as <CONTENT>`: Prompt for a path, then save the list there
//! - `todolist open`: Prompt for another list and print it
//! - `todolist path`: Print the active list path
//!
//! # Environment Variables
//!
//! See the [`config`](todolist::config) module for available configuration options.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use todolist::config::Config;
use todolist::dialog::PromptPicker;
use todolist::session::ListSession;
use todolist::tracker::{ChannelObserver, Notification};

/// Todolist - todo list file keeper.
#[derive(Parser, Debug)]
#[command(name = "todolist")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    TODOLIST_FILE    List file (default: ~/mylist.json)
    RUST_LOG         Log filter (default: info)

EXAMPLES:
    # Follow the list while editing it elsewhere
    todolist watch

    # Replace the list
    todolist save '[{\"id\":1}]'
")]
struct Cli {
    /// List file to use instead of TODOLIST_FILE or the default.
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Print the list every time it changes on disk, until Ctrl+C.
    Watch,

    /// Print the list.
    Show,

    /// Replace the list with CONTENT.
    Save {
        /// New list content, stored as is.
        content: String,
    },

    /// Prompt for a path, switch to it and save CONTENT there.
    SaveAs {
        /// New list content, stored as is.
        content: String,
    },

    /// Prompt for another list, switch to it and print it.
    Open,

    /// Print the active list path.
    Path,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging();

    let config = match cli.file {
        Some(path) => Config::with_list_path(path),
        None => Config::from_env().context("Failed to load configuration")?,
    };

    if let Command::Path = cli.command {
        println!("{}", config.list_path.display());
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(run(config, cli.command))
}

/// Starts a session and runs one command against it.
async fn run(config: Config, command: Command) -> Result<()> {
    let (observer, notifications) = ChannelObserver::channel();
    let mut session = ListSession::start(
        &config,
        Arc::new(observer),
        Box::new(PromptPicker::stdio()),
    )
    .with_context(|| format!("Failed to open list {}", config.list_path.display()))?;

    info!(path = %session.path().display(), "List ready");

    let result = match command {
        Command::Watch => watch(&session, notifications).await,
        Command::Show => print_list(&session),
        Command::Save { content } => session.save_list(&content).map_err(Into::into),
        Command::SaveAs { content } => session
            .save_list_as(&content)
            .map(|_| ())
            .map_err(Into::into),
        Command::Open => match session.load_new_list() {
            Ok(true) => print_list(&session),
            Ok(false) => Ok(()),
            Err(e) => Err(e.into()),
        },
        Command::Path => Ok(()),
    };

    session.shutdown();
    result
}

/// Prints the list on start and after every change until shutdown.
async fn watch(
    session: &ListSession,
    mut notifications: mpsc::UnboundedReceiver<Notification>,
) -> Result<()> {
    print_list(session)?;
    info!("Watching for changes. Press Ctrl+C to stop.");

    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                return Ok(());
            }

            notification = notifications.recv() => match notification {
                Some(Notification::ContentChanged) => {
                    // Already reported through the observer on failure.
                    if let Ok(content) = session.load_list() {
                        println!("{content}");
                    }
                }
                Some(Notification::Error(message)) => {
                    error!(error = %message, "Watch error");
                }
                None => return Ok(()),
            }
        }
    }
}

fn print_list(session: &ListSession) -> Result<()> {
    let content = session.load_list()?;
    println!("{content}");
    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
