//! Raw storage for the tracked list file.
//!
//! [`FileStore`] reads and writes the list as opaque text. It never looks at
//! the content and knows nothing about watching; see [`crate::tracker`] for
//! that.
//!
//! Saves are atomic from a reader's point of view: content goes to a uniquely
//! named sibling temp file which is then renamed over the target, so a
//! concurrent reader sees either the old list or the new one. A symlinked list
//! is written through to the file the link points at.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Result, TodoError};

/// Content written when the list file does not exist yet.
pub const EMPTY_LIST: &str = "[]";

/// Durable read/write access to the tracked list file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Creates a store for `path`. The file is not touched.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the current list path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the list path. The file at the old path is left as it is.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
    }

    /// Creates the list file with an empty list if it does not exist.
    ///
    /// The new file is readable and writable by its owner only. An existing
    /// file is never modified.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::Create`] if the file cannot be created.
    pub fn ensure_exists(&self) -> Result<()> {
        let create_err = |source| TodoError::Create {
            path: self.path.clone(),
            source,
        };

        if self.path.try_exists().map_err(create_err)? {
            return Ok(());
        }

        let mut file = match owner_only_options().create_new(true).open(&self.path) {
            Ok(file) => file,
            // Lost a race with another creator; their file wins.
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(()),
            Err(e) => return Err(create_err(e)),
        };
        file.write_all(EMPTY_LIST.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(create_err)?;

        info!(path = %self.path.display(), "Created empty list");
        Ok(())
    }

    /// Reads the whole list.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::Read`] if the file is missing or unreadable.
    pub fn load(&self) -> Result<String> {
        info!(path = %self.path.display(), "Loading list");
        fs::read_to_string(&self.path).map_err(|source| TodoError::Read {
            path: self.path.clone(),
            source,
        })
    }

    /// Replaces the whole list with `content`.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::Write`] if the content cannot be written or the
    /// temp file cannot be renamed into place.
    pub fn save(&self, content: &str) -> Result<()> {
        debug!(path = %self.path.display(), bytes = content.len(), "Saving list");
        write_atomic(&self.path, content.as_bytes()).map_err(|source| TodoError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

fn owner_only_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
}

/// Writes `content` to a temp file next to `path` and renames it over `path`.
///
/// A symlinked list is resolved first so the link survives and its target
/// gets the new content. An existing file keeps its permissions; a new one is
/// owner read/write only.
fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let existing = match fs::metadata(path) {
        Ok(meta) => Some(meta),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(e),
    };
    let target = match existing {
        Some(_) => fs::canonicalize(path)?,
        None => path.to_path_buf(),
    };
    let parent = match target.parent() {
        Some(p) if p.as_os_str().is_empty() => Path::new("."),
        Some(p) => p,
        None => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "list path has no parent directory",
            ))
        }
    };

    // Dropping the temp file on any early return removes it.
    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    if let Some(meta) = &existing {
        temp.as_file().set_permissions(meta.permissions())?;
    }
    temp.as_file().sync_all()?;
    temp.persist(&target).map_err(|e| e.error)?;

    if target != path {
        debug!(link = %path.display(), target = %target.display(), "Saved through symlink");
    }
    Ok(())
}
