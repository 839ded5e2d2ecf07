//! Live change notification for the tracked list file.
//!
//! [`FileTracker`] owns exactly one filesystem subscription, bound to the
//! current list path, and a background task that turns raw write events into
//! [`ChangeObserver::content_changed`] calls.
//!
//! # Architecture
//!
//! The subscription is placed on the list file's parent directory rather than
//! on the file itself: saves replace the file by renaming a temp file over it,
//! which would orphan a watch bound to the old inode. Events are filtered down
//! to the one tracked path before they reach the observer.
//!
//! The [`notify`] callback only classifies events and pushes them through an
//! unbounded channel. The dispatch task and [`FileTracker::switch_path`] share
//! one mutex over the subscription and the tracked path; the task holds it
//! while matching an event and notifying, so once a switch returns no event for
//! the previous path is delivered.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use todolist::tracker::{ChannelObserver, FileTracker, Notification};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (observer, mut notifications) = ChannelObserver::channel();
//!     let tracker = FileTracker::start("/tmp/a.json", Arc::new(observer))?;
//!
//!     while let Some(notification) = notifications.recv().await {
//!         match notification {
//!             Notification::ContentChanged => println!("list changed on disk"),
//!             Notification::Error(message) => eprintln!("watch error: {message}"),
//!         }
//!     }
//!
//!     tracker.shutdown();
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use notify::{
    event::{ModifyKind, RenameMode},
    Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::error::{Result, TodoError};

/// Receives notifications from a [`FileTracker`].
///
/// The dispatch task calls both methods while holding the tracker's state
/// lock, so implementations must return promptly and must not call back into
/// the tracker. [`FileTracker::switch_path`] also calls `error` directly when
/// it is left without a subscription.
pub trait ChangeObserver: Send + Sync {
    /// The tracked file was written.
    fn content_changed(&self);

    /// Watching failed; `message` describes the failure.
    fn error(&self, message: &str);
}

/// A notification as delivered by [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The tracked file was written.
    ContentChanged,
    /// Watching failed.
    Error(String),
}

/// Observer that forwards notifications into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelObserver {
    /// Creates an observer and the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            debug!("Notification receiver dropped");
        }
    }
}

impl ChangeObserver for ChannelObserver {
    fn content_changed(&self) {
        self.forward(Notification::ContentChanged);
    }

    fn error(&self, message: &str) {
        self.forward(Notification::Error(message.to_string()));
    }
}

/// Raw input to the dispatch task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A write-type event for `path`.
    Write(PathBuf),
    /// The underlying watch reported an error.
    Error(String),
}

/// A live registration with the OS change mechanism.
///
/// `attach` and `detach` are given the directory containing the tracked file.
pub trait Subscription: Send {
    /// Starts delivering events for `dir`.
    fn attach(&mut self, dir: &Path) -> notify::Result<()>;

    /// Stops delivering events for `dir`.
    fn detach(&mut self, dir: &Path) -> notify::Result<()>;
}

impl Subscription for RecommendedWatcher {
    fn attach(&mut self, dir: &Path) -> notify::Result<()> {
        self.watch(dir, RecursiveMode::NonRecursive)
    }

    fn detach(&mut self, dir: &Path) -> notify::Result<()> {
        self.unwatch(dir)
    }
}

/// Where events for a tracked path come from.
#[derive(Debug, Clone, PartialEq, Eq)]
struct WatchTarget {
    /// Canonical parent directory, the subscribed path.
    dir: PathBuf,
    /// Real path of the list inside `dir`, compared against event paths.
    file: PathBuf,
}

impl WatchTarget {
    /// Resolves `path`, following it to its real location if it exists, so a
    /// symlinked list is watched where saves actually land.
    fn resolve(path: &Path) -> notify::Result<Self> {
        if let Ok(real) = path.canonicalize() {
            if let Some(dir) = real.parent() {
                return Ok(Self {
                    dir: dir.to_path_buf(),
                    file: real.clone(),
                });
            }
        }

        let name = path.file_name().ok_or_else(|| {
            notify::Error::generic("list path has no file name").add_path(path.to_path_buf())
        })?;
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let dir = parent
            .canonicalize()
            .map_err(|e| notify::Error::io(e).add_path(parent.to_path_buf()))?;

        Ok(Self {
            file: dir.join(name),
            dir,
        })
    }
}

struct TrackerState {
    subscription: Box<dyn Subscription>,
    /// Tracked list path as given by the caller.
    path: PathBuf,
    /// `None` only after an attach failure left nothing subscribed.
    target: Option<WatchTarget>,
    stopped: bool,
}

impl TrackerState {
    fn is_watching(&self, path: &Path) -> bool {
        !self.stopped && self.target.as_ref().is_some_and(|t| t.file == path)
    }
}

fn lock(state: &Mutex<TrackerState>) -> MutexGuard<'_, TrackerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Tracks one list file and reports writes to it.
pub struct FileTracker {
    state: Arc<Mutex<TrackerState>>,
    observer: Arc<dyn ChangeObserver>,
    task: JoinHandle<()>,
}

impl FileTracker {
    /// Starts tracking `path` with the platform's recommended watcher.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::WatchStart`] if the watcher cannot be created or
    /// the file's directory cannot be subscribed.
    pub fn start(path: impl Into<PathBuf>, observer: Arc<dyn ChangeObserver>) -> Result<Self> {
        let path = path.into();
        info!(path = %path.display(), "Starting watcher");

        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| forward_notify_event(res, &tx),
            Config::default(),
        )
        .map_err(|source| TodoError::WatchStart {
            path: path.clone(),
            source,
        })?;

        Self::with_subscription(path, Box::new(watcher), rx, observer)
    }

    /// Starts tracking `path` over a caller-supplied subscription and event
    /// stream.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::WatchStart`] if `path` cannot be subscribed.
    pub fn with_subscription(
        path: impl Into<PathBuf>,
        mut subscription: Box<dyn Subscription>,
        events: mpsc::UnboundedReceiver<WatchEvent>,
        observer: Arc<dyn ChangeObserver>,
    ) -> Result<Self> {
        let path = path.into();
        let start_err = |source| TodoError::WatchStart {
            path: path.clone(),
            source,
        };

        let target = WatchTarget::resolve(&path).map_err(start_err)?;
        subscription.attach(&target.dir).map_err(start_err)?;

        debug!(dir = %target.dir.display(), "Subscribed to list directory");
        info!(path = %path.display(), "Now watching");

        let state = Arc::new(Mutex::new(TrackerState {
            subscription,
            path,
            target: Some(target),
            stopped: false,
        }));

        let task = tokio::spawn(dispatch_events(
            events,
            Arc::clone(&state),
            Arc::clone(&observer),
        ));

        Ok(Self {
            state,
            observer,
            task,
        })
    }

    /// Returns the tracked path, whether or not it is currently subscribed.
    #[must_use]
    pub fn tracked_path(&self) -> PathBuf {
        lock(&self.state).path.clone()
    }

    /// Returns the path being watched, or `None` if the last switch failed to
    /// attach.
    #[must_use]
    pub fn watched_path(&self) -> Option<PathBuf> {
        let state = lock(&self.state);
        state.target.as_ref().map(|_| state.path.clone())
    }

    /// Moves the subscription from the current path to `new_path`.
    ///
    /// The old subscription is removed before the new one is added. The switch
    /// itself emits no `content_changed`.
    ///
    /// # Errors
    ///
    /// - [`TodoError::WatchDetach`]: the old path could not be unsubscribed.
    ///   Nothing changed; the old path is still watched.
    /// - [`TodoError::WatchAttach`]: the old path was released but `new_path`
    ///   could not be subscribed. `new_path` becomes the tracked path with no
    ///   active subscription, and the observer is sent an error.
    pub fn switch_path(&self, new_path: impl Into<PathBuf>) -> Result<()> {
        let new_path = new_path.into();

        let outcome = {
            let mut guard = lock(&self.state);
            let state = &mut *guard;

            if let Some(target) = &state.target {
                if let Err(source) = state.subscription.detach(&target.dir) {
                    return Err(TodoError::WatchDetach {
                        path: state.path.clone(),
                        source,
                    });
                }
                debug!(dir = %target.dir.display(), "Unsubscribed from list directory");
            }
            state.target = None;
            state.path = new_path.clone();

            let attached = WatchTarget::resolve(&new_path).and_then(|target| {
                state.subscription.attach(&target.dir)?;
                Ok(target)
            });
            match attached {
                Ok(target) => {
                    state.target = Some(target);
                    Ok(())
                }
                Err(source) => Err(TodoError::WatchAttach {
                    path: new_path.clone(),
                    source,
                }),
            }
        };

        match outcome {
            Ok(()) => {
                info!(path = %new_path.display(), "Now watching");
                Ok(())
            }
            Err(e) => {
                error!(path = %new_path.display(), error = %e, "List is no longer watched");
                self.observer.error(&e.to_string());
                Err(e)
            }
        }
    }

    /// Removes the subscription and stops the dispatch task.
    ///
    /// No notification is delivered once this returns.
    pub fn shutdown(self) {
        let mut guard = lock(&self.state);
        let state = &mut *guard;
        state.stopped = true;

        if let Some(target) = state.target.take() {
            if let Err(e) = state.subscription.detach(&target.dir) {
                warn!(dir = %target.dir.display(), error = %e, "Failed to unsubscribe on shutdown");
            }
        }
        info!(path = %state.path.display(), "Watcher stopped");
    }
}

impl Drop for FileTracker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Handles results from the notify callback.
///
/// Kept lightweight: classification only, everything else happens in the
/// dispatch task.
fn forward_notify_event(
    res: notify::Result<Event>,
    tx: &mpsc::UnboundedSender<WatchEvent>,
) {
    let event = match res {
        Ok(event) => event,
        Err(e) => {
            if tx.send(WatchEvent::Error(e.to_string())).is_err() {
                debug!(error = %e, "Dispatch task gone, dropping watcher error");
            }
            return;
        }
    };

    trace!(kind = ?event.kind, paths = ?event.paths, "Received notify event");

    // The backend dropped events (e.g. inotify queue overflow); writes to the
    // list may have been missed.
    if event.need_rescan() {
        warn!("File watcher dropped events");
        if tx
            .send(WatchEvent::Error(
                "filesystem events were dropped; the list may have changed".to_string(),
            ))
            .is_err()
        {
            debug!("Dispatch task gone, dropping rescan notice");
        }
        return;
    }

    if !is_write(&event.kind) {
        return;
    }

    for path in event.paths {
        if tx.send(WatchEvent::Write(path)).is_err() {
            debug!("Dispatch task gone, dropping write event");
            return;
        }
    }
}

/// Whether `kind` means the file's content may have changed.
///
/// A rename counts on its destination side only, so a save that renames a
/// temp file into place is reported once.
fn is_write(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Modify(
                ModifyKind::Data(_)
                    | ModifyKind::Any
                    | ModifyKind::Other
                    | ModifyKind::Name(RenameMode::To | RenameMode::Any)
            )
    )
}

/// Runs until the event channel closes or the tracker is dropped.
async fn dispatch_events(
    mut events: mpsc::UnboundedReceiver<WatchEvent>,
    state: Arc<Mutex<TrackerState>>,
    observer: Arc<dyn ChangeObserver>,
) {
    while let Some(event) = events.recv().await {
        dispatch(&state, observer.as_ref(), event);
    }

    debug!("Dispatch task shutting down");
}

fn dispatch(state: &Mutex<TrackerState>, observer: &dyn ChangeObserver, event: WatchEvent) {
    let state = lock(state);
    if state.stopped {
        return;
    }

    match event {
        WatchEvent::Write(path) => {
            if state.is_watching(&path) {
                info!(path = %path.display(), "Modified list file");
                observer.content_changed();
            } else {
                trace!(path = %path.display(), "Ignoring event for untracked path");
            }
        }
        WatchEvent::Error(message) => {
            error!(error = %message, "File watcher error");
            observer.error(&message);
        }
    }
}
