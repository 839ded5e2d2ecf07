//! Host-facing list operations.
//!
//! [`ListSession`] wires a [`FileStore`] to a [`FileTracker`] and keeps them
//! pointing at the same file. It is what a UI calls into: load, save, save as,
//! and open another list.
//!
//! Failures are returned to the caller and also sent to the observer's
//! `error` signal, the same place background watch errors arrive, so a UI has
//! one spot to display them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::Config;
use crate::dialog::PathPicker;
use crate::error::{Result, TodoError};
use crate::store::FileStore;
use crate::tracker::{ChangeObserver, FileTracker};

/// The active list file, its watcher, and the dialogs that can change it.
pub struct ListSession {
    store: FileStore,
    tracker: FileTracker,
    observer: Arc<dyn ChangeObserver>,
    picker: Box<dyn PathPicker>,
}

impl ListSession {
    /// Creates the list file if needed and starts watching it.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::Create`] if the default list cannot be created, or
    /// [`TodoError::WatchStart`] if it cannot be watched. Both are fatal.
    pub fn start(
        config: &Config,
        observer: Arc<dyn ChangeObserver>,
        picker: Box<dyn PathPicker>,
    ) -> Result<Self> {
        let store = FileStore::new(&config.list_path);
        store.ensure_exists()?;

        let tracker = FileTracker::start(store.path(), Arc::clone(&observer))?;

        Ok(Self {
            store,
            tracker,
            observer,
            picker,
        })
    }

    /// Returns the active list path, suitable for a window title.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Returns the tracker watching the active list.
    #[must_use]
    pub fn tracker(&self) -> &FileTracker {
        &self.tracker
    }

    /// Reads the active list.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::Read`] if the list cannot be read.
    pub fn load_list(&self) -> Result<String> {
        self.store.load().map_err(|e| self.report(e))
    }

    /// Overwrites the active list with `content`.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::Write`] if the list cannot be written.
    pub fn save_list(&self, content: &str) -> Result<()> {
        info!(path = %self.store.path().display(), "Saving list");
        self.store.save(content).map_err(|e| self.report(e))
    }

    /// Asks where to save, moves tracking there, then writes `content`.
    ///
    /// Does nothing if the user cancels. Returns `true` if a path was chosen.
    ///
    /// # Errors
    ///
    /// - [`TodoError::WatchDetach`]: nothing was switched or written.
    /// - [`TodoError::WatchAttach`]: the list was still switched and written,
    ///   but the new path is not watched.
    /// - [`TodoError::Write`]: the new path could not be written.
    pub fn save_list_as(&mut self, content: &str) -> Result<bool> {
        let Some(path) = self.picker.select_save_path() else {
            debug!("Save as cancelled");
            return Ok(false);
        };
        info!(path = %path.display(), "Save as");

        let switched = match self.switch_to(path) {
            Err(e @ TodoError::WatchDetach { .. }) => return Err(e),
            other => other,
        };
        self.save_list(content)?;
        switched.map(|()| true)
    }

    /// Asks for another list and makes it the active one.
    ///
    /// Does nothing if the user cancels. On success the observer is told the
    /// content changed so the new list gets displayed. Returns `true` if a
    /// path was chosen.
    ///
    /// # Errors
    ///
    /// See [`FileTracker::switch_path`].
    pub fn load_new_list(&mut self) -> Result<bool> {
        let Some(path) = self.picker.select_open_path() else {
            debug!("Open cancelled");
            return Ok(false);
        };

        self.switch_to(path)?;
        self.observer.content_changed();
        Ok(true)
    }

    /// Stops watching.
    pub fn shutdown(self) {
        self.tracker.shutdown();
    }

    /// Switches the tracker first, then points the store at the same path.
    ///
    /// A detach failure changes nothing and is returned as a hard error; any
    /// other failure still moves the store so both stay in step.
    fn switch_to(&mut self, path: PathBuf) -> Result<()> {
        match self.tracker.switch_path(&path) {
            Ok(()) => {
                self.store.set_path(path);
                Ok(())
            }
            Err(e @ TodoError::WatchDetach { .. }) => {
                self.observer.error(&e.to_string());
                Err(e)
            }
            // Already reported by the tracker.
            Err(e) => {
                self.store.set_path(path);
                Err(e)
            }
        }
    }

    fn report(&self, err: TodoError) -> TodoError {
        error!(error = %err, "List operation failed");
        self.observer.error(&err.to_string());
        err
    }
}
