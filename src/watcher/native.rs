//! OS event stream backend.
//!
//! Every directory is registered individually and non-recursively with the OS event
//! API (inotify, ReadDirectoryChangesW, FSEvents/kqueue via `notify`). Recursion is
//! maintained by hand: when a directory is created, it and all of its subdirectories
//! are registered before the create is delivered. Events are taken from a queue by a
//! dedicated thread that blocks between events.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crossbeam_channel::{Receiver, select};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

use super::backend::{BackendId, FileWatchBackend};
use super::error::WatchError;
use super::event::{ChangeCallback, ChangeKind};
use super::fault::{LoopFault, deliver, triage_notify};
use super::handle::{StopToken, WatchHandle};
use super::targets::{directories_under, validate_targets};
use super::translate::{RenameTracker, is_overflow};

const COMPONENT: &str = "native";

/// Per-directory OS event watcher.
#[derive(Debug, Default)]
pub struct NativeBackend {
    initialized: bool,
}

impl NativeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this platform has an OS event API `notify` can drive.
    pub fn is_supported() -> bool {
        cfg!(any(
            target_os = "linux",
            target_os = "android",
            target_os = "windows",
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "openbsd",
            target_os = "netbsd",
            target_os = "dragonfly"
        ))
    }
}

impl FileWatchBackend for NativeBackend {
    fn id(&self) -> BackendId {
        BackendId::Native
    }

    fn initialize(&mut self) -> Result<(), WatchError> {
        if !Self::is_supported() {
            return Err(WatchError::Unsupported {
                backend: BackendId::Native,
                reason: format!("no OS event API on {}", std::env::consts::OS),
            });
        }

        // Probe once so resource exhaustion (e.g. inotify instance limits) fails here
        // rather than on the first watch.
        let probe = notify::recommended_watcher(|_res: notify::Result<Event>| {})?;
        drop(probe);

        self.initialized = true;
        Ok(())
    }

    fn watch(
        &self,
        targets: &[PathBuf],
        on_change: ChangeCallback,
    ) -> Result<WatchHandle, WatchError> {
        if !self.initialized {
            return Err(WatchError::NotInitialized {
                backend: BackendId::Native,
            });
        }

        let roots = validate_targets(targets);

        let (tx, rx) = crossbeam_channel::unbounded();
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })?;

        let mut registry = Registry::new(watcher);
        for root in &roots {
            registry.register_root(root)?;
        }

        crate::log_event!(
            COMPONENT,
            "monitoring",
            "{} directories under {} roots",
            registry.len(),
            roots.len()
        );

        let (handle, stop) = WatchHandle::new(BackendId::Native);
        let thread = std::thread::Builder::new()
            .name("devreload-native".to_string())
            .spawn(move || take_loop(registry, rx, stop, on_change))
            .map_err(WatchError::Spawn)?;

        Ok(handle.with_thread(thread))
    }
}

/// Directory registrations, owned by the detection thread.
///
/// Dropping it drops the OS watcher and with it every registration.
struct Registry {
    watcher: RecommendedWatcher,
    dirs: HashSet<PathBuf>,
}

impl Registry {
    fn new(watcher: RecommendedWatcher) -> Self {
        Self {
            watcher,
            dirs: HashSet::new(),
        }
    }

    fn len(&self) -> usize {
        self.dirs.len()
    }

    /// Register a root and everything below it. Failing on the root itself is fatal.
    fn register_root(&mut self, root: &Path) -> Result<(), WatchError> {
        self.watcher
            .watch(root, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: root.to_path_buf(),
                reason: e.to_string(),
            })?;
        self.dirs.insert(root.to_path_buf());
        self.register_tree(root);
        Ok(())
    }

    /// Register `dir` and its subdirectories, skipping ones already registered.
    fn register_tree(&mut self, dir: &Path) {
        for sub in directories_under(dir) {
            if self.dirs.contains(&sub) {
                continue;
            }
            match self.watcher.watch(&sub, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    crate::debug_event!(COMPONENT, "registered", "{}", sub.display());
                    self.dirs.insert(sub);
                }
                Err(e) => {
                    tracing::warn!("[{COMPONENT}] failed to watch {}: {e}", sub.display());
                }
            }
        }
    }

    fn forget(&mut self, path: &Path) {
        if self.dirs.remove(path) {
            // The OS usually drops the registration itself once the directory is gone.
            let _ = self.watcher.unwatch(path);
            crate::debug_event!(COMPONENT, "unregistered", "{}", path.display());
        }
    }
}

fn take_loop(
    mut registry: Registry,
    events: Receiver<notify::Result<Event>>,
    stop: StopToken,
    on_change: ChangeCallback,
) {
    let mut renames = RenameTracker::new();
    loop {
        select! {
            recv(stop.receiver()) -> _ => break,
            recv(events) -> msg => {
                let keep_going = match msg {
                    Ok(Ok(event)) => {
                        handle_event(&mut registry, &mut renames, &event, &stop, &on_change);
                        true
                    }
                    Ok(Err(err)) => triage_notify(&err, &stop).report(COMPONENT),
                    Err(_) => {
                        let fault = if stop.is_stopped() {
                            LoopFault::Shutdown
                        } else {
                            LoopFault::Fatal("event queue disconnected".to_string())
                        };
                        fault.report(COMPONENT)
                    }
                };
                if !keep_going {
                    break;
                }
            }
        }
    }

    crate::debug_event!(COMPONENT, "stopped", "{} registrations released", registry.len());
}

fn handle_event(
    registry: &mut Registry,
    renames: &mut RenameTracker,
    event: &Event,
    stop: &StopToken,
    on_change: &ChangeCallback,
) {
    if is_overflow(event) {
        tracing::warn!("[{COMPONENT}] event queue overflowed; some changes were not reported");
        return;
    }

    for change in renames.changes(event, Instant::now()) {
        if stop.is_stopped() {
            return;
        }

        match change.kind {
            ChangeKind::Created if change.path.is_dir() => registry.register_tree(&change.path),
            ChangeKind::Deleted => registry.forget(&change.path),
            _ => {}
        }

        crate::debug_event!(COMPONENT, change.kind.label(), "{}", change.path.display());
        deliver(COMPONENT, on_change, &change);
    }
}
