//! Event-driven backends on platforms that support them.
#![cfg(target_os = "linux")]

use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, Instant, SystemTime};

use crossbeam_channel::{Receiver, unbounded};
use devreload::config::WatcherConfig;
use devreload::watcher::{BackendId, ChangeEvent, ChangeKind, WatchCoordinator, callback};
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(5);
const SETTLE: Duration = Duration::from_secs(1);

fn start(backend: BackendId, root: &Path) -> (WatchCoordinator, Receiver<ChangeEvent>) {
    let (tx, rx) = unbounded();
    let config = WatcherConfig {
        backend: Some(backend),
        ..WatcherConfig::default()
    };
    let coordinator = WatchCoordinator::start(
        &config,
        vec![root.to_path_buf()],
        callback(move |event| {
            let _ = tx.send(event.clone());
        }),
    )
    .unwrap();
    (coordinator, rx)
}

/// Wait for an event on `path` of the given kind.
fn wait_for(rx: &Receiver<ChangeEvent>, path: &Path, kind: ChangeKind) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(remaining) {
            Ok(event) if event.path == path && event.kind == kind => return true,
            Ok(_) => continue,
            Err(_) => return false,
        }
    }
    false
}

/// Everything delivered within `window`.
fn collect(rx: &Receiver<ChangeEvent>, window: Duration) -> Vec<ChangeEvent> {
    let deadline = Instant::now() + window;
    let mut events = Vec::new();
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(remaining) {
            Ok(event) => events.push(event),
            Err(_) => break,
        }
    }
    events
}

fn count(events: &[ChangeEvent], path: &Path, kind: ChangeKind) -> usize {
    events
        .iter()
        .filter(|e| e.path == path && e.kind == kind)
        .count()
}

/// Rename within a watched directory: exactly one delete and one create.
fn assert_rename_reported_once(backend: BackendId) {
    let temp = TempDir::new().unwrap();
    let old = temp.path().join("Old.scala");
    fs::write(&old, "object Old").unwrap();

    let (coordinator, rx) = start(backend, temp.path());

    let new = temp.path().join("New.scala");
    fs::rename(&old, &new).unwrap();

    let events = collect(&rx, SETTLE);
    assert_eq!(count(&events, &old, ChangeKind::Deleted), 1, "{backend}: {events:?}");
    assert_eq!(count(&events, &new, ChangeKind::Created), 1, "{backend}: {events:?}");

    coordinator.close();
}

#[test]
fn test_native_reports_create_and_delete() {
    let temp = TempDir::new().unwrap();
    let (coordinator, rx) = start(BackendId::Native, temp.path());

    let file = temp.path().join("application.conf");
    fs::write(&file, "play.http.secret.key=changeme").unwrap();
    assert!(wait_for(&rx, &file, ChangeKind::Created));

    fs::remove_file(&file).unwrap();
    assert!(wait_for(&rx, &file, ChangeKind::Deleted));

    coordinator.close();
    coordinator.close();
}

#[test]
fn test_native_follows_new_subdirectories() {
    let temp = TempDir::new().unwrap();
    let (coordinator, rx) = start(BackendId::Native, temp.path());

    let views = temp.path().join("views");
    fs::create_dir(&views).unwrap();
    assert!(wait_for(&rx, &views, ChangeKind::Created));

    let file = views.join("index.scala.html");
    fs::write(&file, "@()").unwrap();
    assert!(wait_for(&rx, &file, ChangeKind::Created));

    coordinator.close();
}

#[test]
fn test_native_reports_rename_once() {
    assert_rename_reported_once(BackendId::Native);
}

#[test]
fn test_notifier_reports_rename_once() {
    assert_rename_reported_once(BackendId::Notifier);
}

#[test]
fn test_native_modification_reported_once() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("index.scala.html");
    fs::write(&file, "<h1>v1</h1>").unwrap();

    let (coordinator, rx) = start(BackendId::Native, temp.path());

    // Only the timestamp changes, so the OS reports a single attribute event
    let handle = File::options().write(true).open(&file).unwrap();
    handle
        .set_modified(SystemTime::now() + Duration::from_secs(10))
        .unwrap();
    drop(handle);

    let events = collect(&rx, SETTLE);
    assert_eq!(count(&events, &file, ChangeKind::Modified), 1, "{events:?}");
    assert_eq!(count(&events, &file, ChangeKind::Created), 0, "{events:?}");

    coordinator.close();
}

#[test]
fn test_notifier_modification() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("routes");
    fs::write(&file, "GET / Home.index").unwrap();

    let (coordinator, rx) = start(BackendId::Notifier, temp.path());

    fs::write(&file, "GET /about Home.about").unwrap();
    assert!(wait_for(&rx, &file, ChangeKind::Modified));

    coordinator.close();
}
