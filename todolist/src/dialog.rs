//! File selection for "open" and "save as".
//!
//! A GUI host would back [`PathPicker`] with native dialogs. [`PromptPicker`]
//! asks on the terminal instead.

use std::io::{self, BufRead, Stderr, StdinLock, Write};
use std::path::PathBuf;

use tracing::warn;

/// Asks the user for a list path. `None` means the user cancelled.
pub trait PathPicker {
    /// Picks an existing list to open.
    fn select_open_path(&mut self) -> Option<PathBuf>;

    /// Picks where to save the list.
    fn select_save_path(&mut self) -> Option<PathBuf>;
}

/// Reads a path from a line of input. An empty line cancels.
#[derive(Debug)]
pub struct PromptPicker<R, W> {
    input: R,
    output: W,
}

impl PromptPicker<StdinLock<'static>, Stderr> {
    /// Prompts on stderr and reads from stdin.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> PromptPicker<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn prompt(&mut self, label: &str) -> Option<PathBuf> {
        let mut line = String::new();
        let read = write!(self.output, "{label} (empty to cancel): ")
            .and_then(|()| self.output.flush())
            .and_then(|()| self.input.read_line(&mut line));

        if let Err(e) = read {
            warn!(error = %e, "Failed to read path, treating as cancel");
            return None;
        }

        let trimmed = line.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }
}

impl<R: BufRead, W: Write> PathPicker for PromptPicker<R, W> {
    fn select_open_path(&mut self) -> Option<PathBuf> {
        self.prompt("Open list")
    }

    fn select_save_path(&mut self) -> Option<PathBuf> {
        self.prompt("Save list as")
    }
}
