//! Error types for the todo list keeper.
//!
//! Every file or watch failure carries the path it concerns together with the
//! underlying cause, so a host can show a single uniform message.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while keeping or watching the list file.
#[derive(Error, Debug)]
pub enum TodoError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The default list file could not be created.
    #[error("unable to create list {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The list file could not be read.
    #[error("unable to open list {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The list file could not be written.
    #[error("unable to save list {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The filesystem watch could not be created for the initial path.
    #[error("failed to start watching {}: {source}", path.display())]
    WatchStart {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// The previous path could not be unsubscribed; nothing was switched.
    #[error("failed to stop watching {}: {source}", path.display())]
    WatchDetach {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// The new path could not be subscribed; nothing is being watched.
    #[error("failed to start watching {}: {source}", path.display())]
    WatchAttach {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

impl TodoError {
    /// Returns the path the error concerns, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Config(_) => None,
            Self::Create { path, .. }
            | Self::Read { path, .. }
            | Self::Write { path, .. }
            | Self::WatchStart { path, .. }
            | Self::WatchDetach { path, .. }
            | Self::WatchAttach { path, .. } => Some(path),
        }
    }
}

/// A specialized `Result` type for todo list operations.
pub type Result<T> = std::result::Result<T, TodoError>;
