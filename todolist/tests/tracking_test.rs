//! Integration tests for live change notification.
//!
//! These tests run against the platform watcher, so notifications arrive
//! asynchronously. Positive checks poll with a timeout; negative checks wait a
//! fixed settle period and then require silence.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep, timeout};
use todolist::config::Config;
use todolist::dialog::PathPicker;
use todolist::session::ListSession;
use todolist::store::FileStore;
use todolist::tracker::{ChannelObserver, FileTracker, Notification};

// =============================================================================
// Test Helpers
// =============================================================================

/// How long to wait for an expected notification.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait before concluding no notification is coming.
const SETTLE: Duration = Duration::from_millis(500);

/// Picker that always answers with the same save path.
struct FixedSavePicker(PathBuf);

impl PathPicker for FixedSavePicker {
    fn select_open_path(&mut self) -> Option<PathBuf> {
        None
    }

    fn select_save_path(&mut self) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

fn create_list(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write list");
    path
}

async fn expect_change(rx: &mut UnboundedReceiver<Notification>) {
    let notification = timeout(NOTIFY_TIMEOUT, rx.recv())
        .await
        .expect("Timed out waiting for change notification")
        .expect("Notification channel closed");
    assert_eq!(notification, Notification::ContentChanged);
}

/// Waits out the settle period and discards whatever arrived.
async fn drain(rx: &mut UnboundedReceiver<Notification>) {
    sleep(SETTLE).await;
    while rx.try_recv().is_ok() {}
}

async fn expect_quiet(rx: &mut UnboundedReceiver<Notification>) {
    sleep(SETTLE).await;
    let leftover: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert!(leftover.is_empty(), "Unexpected notifications: {leftover:?}");
}

fn start_tracker(path: &Path) -> (FileTracker, UnboundedReceiver<Notification>) {
    let (observer, rx) = ChannelObserver::channel();
    let tracker = FileTracker::start(path, Arc::new(observer)).expect("Should start tracker");
    (tracker, rx)
}

// =============================================================================
// Tracker Tests
// =============================================================================

/// An independent writer touching the tracked file produces a notification.
///
/// Only "at least one" is checked: `fs::write` on a non-empty file truncates
/// and then writes, which the OS may report as two modifications, and events
/// are deliberately not coalesced (see the write-events decision in
/// DESIGN.md).
#[tokio::test]
async fn test_external_write_notifies() {
    let dir = TempDir::new().unwrap();
    let a = create_list(dir.path(), "a.json", "[]");
    let (tracker, mut rx) = start_tracker(&a);

    fs::write(&a, "[\"eggs\"]").unwrap();
    expect_change(&mut rx).await;

    tracker.shutdown();
}

/// Saving through the store is also seen; self-inflicted writes are not
/// suppressed.
#[tokio::test]
async fn test_own_save_notifies() {
    let dir = TempDir::new().unwrap();
    let a = create_list(dir.path(), "a.json", "[]");
    let (tracker, mut rx) = start_tracker(&a);

    FileStore::new(&a).save("[1]").unwrap();
    expect_change(&mut rx).await;

    // The store's rename replaced the file; the watch must survive it.
    drain(&mut rx).await;
    fs::write(&a, "[2]").unwrap();
    expect_change(&mut rx).await;

    tracker.shutdown();
}

/// A symlinked list is watched at its real location, so saves through the
/// link are seen and the link itself is kept.
#[cfg(unix)]
#[tokio::test]
async fn test_symlinked_list_is_tracked() {
    let dir = TempDir::new().unwrap();
    let real = create_list(dir.path(), "real.json", "[]");
    let link = dir.path().join("link.json");
    std::os::unix::fs::symlink(&real, &link).unwrap();
    let (tracker, mut rx) = start_tracker(&link);

    FileStore::new(&link).save("[1]").unwrap();
    expect_change(&mut rx).await;
    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(fs::read_to_string(&real).unwrap(), "[1]");

    drain(&mut rx).await;
    fs::write(&real, "[2]").unwrap();
    expect_change(&mut rx).await;

    tracker.shutdown();
}

/// Switching alone is not a content change.
#[tokio::test]
async fn test_switch_emits_nothing() {
    let dir = TempDir::new().unwrap();
    let a = create_list(dir.path(), "a.json", "[]");
    let b = create_list(dir.path(), "b.json", "[]");
    let (tracker, mut rx) = start_tracker(&a);
    drain(&mut rx).await;

    tracker.switch_path(&b).unwrap();
    assert_eq!(tracker.watched_path(), Some(b.clone()));
    expect_quiet(&mut rx).await;

    tracker.shutdown();
}

/// After a switch into another directory only the new file is reported.
#[tokio::test]
async fn test_switch_across_directories() {
    let dir = TempDir::new().unwrap();
    let other_dir = TempDir::new().unwrap();
    let a = create_list(dir.path(), "a.json", "[]");
    let b = create_list(other_dir.path(), "b.json", "[]");
    let (tracker, mut rx) = start_tracker(&a);

    tracker.switch_path(&b).unwrap();

    fs::write(&a, "[\"old\"]").unwrap();
    expect_quiet(&mut rx).await;

    fs::write(&b, "[\"new\"]").unwrap();
    expect_change(&mut rx).await;

    tracker.shutdown();
}

/// Writes after shutdown are not reported.
#[tokio::test]
async fn test_shutdown_stops_notifications() {
    let dir = TempDir::new().unwrap();
    let a = create_list(dir.path(), "a.json", "[]");
    let (tracker, mut rx) = start_tracker(&a);

    tracker.shutdown();
    fs::write(&a, "[\"late\"]").unwrap();
    expect_quiet(&mut rx).await;
}

// =============================================================================
// Session Scenario
// =============================================================================

/// Save, save as, then check which file is being watched.
#[tokio::test]
async fn test_save_as_scenario() {
    let dir = TempDir::new().unwrap();
    let a = create_list(dir.path(), "a.json", "[]");
    let b = dir.path().join("b.json");

    let (observer, mut rx) = ChannelObserver::channel();
    let mut session = ListSession::start(
        &Config::with_list_path(&a),
        Arc::new(observer),
        Box::new(FixedSavePicker(b.clone())),
    )
    .expect("Should start session");

    session.save_list("[{\"id\":1}]").unwrap();
    assert_eq!(session.load_list().unwrap(), "[{\"id\":1}]");
    expect_change(&mut rx).await;

    assert!(session.save_list_as("[{\"id\":1}]").unwrap());
    assert_eq!(session.tracker().watched_path(), Some(b.clone()));
    assert_eq!(session.path(), b.as_path());
    assert_eq!(fs::read_to_string(&a).unwrap(), "[{\"id\":1}]");
    assert_eq!(fs::read_to_string(&b).unwrap(), "[{\"id\":1}]");
    drain(&mut rx).await;

    fs::write(&a, "[\"stale\"]").unwrap();
    expect_quiet(&mut rx).await;

    fs::write(&b, "[\"fresh\"]").unwrap();
    expect_change(&mut rx).await;
    assert_eq!(session.load_list().unwrap(), "[\"fresh\"]");

    session.shutdown();
}
