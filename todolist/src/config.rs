//! Configuration module for the todo list keeper.
//!
//! Resolves which file is tracked at startup.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `TODOLIST_FILE` | No | `~/mylist.json` | Path of the tracked list file |
//!
//! When no home directory can be determined the default falls back to
//! `mylist.json` in the current working directory.
//!
//! # Example
//!
//! ```no_run
//! use todolist::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Tracking: {}", config.list_path.display());
//! ```

use std::env;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use thiserror::Error;

/// File name of the default list, joined onto the home or working directory.
pub const DEFAULT_LIST_FILE: &str = "mylist.json";

/// Environment variable overriding the tracked file.
pub const LIST_FILE_ENV: &str = "TODOLIST_FILE";

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Neither a home directory nor a working directory could be determined.
    #[error("failed to determine home or working directory")]
    NoDefaultLocation,
}

/// Configuration for the todo list keeper.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute path of the list file to track.
    pub list_path: PathBuf,
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - `TODOLIST_FILE` is set but empty
    /// - `TODOLIST_FILE` is unset and no home or working directory is available
    pub fn from_env() -> Result<Self, ConfigError> {
        let cwd = env::current_dir().ok();

        let list_path = match env::var(LIST_FILE_ENV) {
            Ok(val) if val.trim().is_empty() => {
                return Err(ConfigError::InvalidValue {
                    key: LIST_FILE_ENV.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }
            Ok(val) => absolutize(PathBuf::from(val), cwd.as_deref()),
            Err(_) => {
                let base_dirs = BaseDirs::new();
                default_list_path(base_dirs.as_ref().map(BaseDirs::home_dir), cwd)?
            }
        };

        Ok(Self { list_path })
    }

    /// Creates a `Config` tracking an explicit path, e.g. from a CLI flag.
    pub fn with_list_path(path: impl Into<PathBuf>) -> Self {
        let cwd = env::current_dir().ok();
        Self {
            list_path: absolutize(path.into(), cwd.as_deref()),
        }
    }
}

/// Computes the default list path.
///
/// The working directory is the baseline; a home directory, when known, wins.
pub fn default_list_path(
    home_dir: Option<&Path>,
    cwd: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    let mut path = cwd.map(|dir| dir.join(DEFAULT_LIST_FILE));

    if let Some(home) = home_dir {
        path = Some(home.join(DEFAULT_LIST_FILE));
    }

    path.ok_or(ConfigError::NoDefaultLocation)
}

/// Joins relative paths onto the working directory.
fn absolutize(path: PathBuf, cwd: Option<&Path>) -> PathBuf {
    match cwd {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path,
    }
}
