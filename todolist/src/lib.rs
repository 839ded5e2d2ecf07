//! Todolist - keeps one todo list file and reports when it changes on disk.
//!
//! The list is stored as opaque text in a single "active" file. A filesystem
//! watch on that file notifies an observer whenever it is written, whether by
//! this process or by someone editing the file directly. The active file can
//! be switched at runtime ("open", "save as"); the watch follows it.
//!
//! # Modules
//!
//! - [`config`]: Default list location from environment, home and cwd
//! - [`error`]: Error types for list and watch operations
//! - [`store`]: Raw, atomic read/write of the list file
//! - [`tracker`]: Filesystem subscription and change dispatch
//! - [`dialog`]: Path selection for open / save as
//! - [`session`]: Host-facing operations tying the above together

pub mod config;
pub mod dialog;
pub mod error;
pub mod session;
pub mod store;
pub mod tracker;

pub use config::{Config, ConfigError};
pub use dialog::{PathPicker, PromptPicker};
pub use error::{Result, TodoError};
pub use session::ListSession;
pub use store::{FileStore, EMPTY_LIST};
pub use tracker::{
    ChangeObserver, ChannelObserver, FileTracker, Notification, Subscription, WatchEvent,
};
