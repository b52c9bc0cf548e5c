//! Native notifier backend.
//!
//! Hands each root to the `notify` library in recursive mode and lets the library's
//! own thread deliver callbacks. Renames arrive as a delete of the old name followed
//! by a create of the new one.

use std::path::PathBuf;
use std::time::Instant;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

use super::backend::{BackendId, FileWatchBackend};
use super::error::WatchError;
use super::event::ChangeCallback;
use super::fault::{deliver, triage_notify};
use super::handle::WatchHandle;
use super::targets::validate_targets;
use super::translate::{RenameTracker, is_overflow};

const COMPONENT: &str = "notifier";

/// Recursive watcher backed by the platform notifier library.
#[derive(Debug, Default)]
pub struct NotifierBackend {
    /// Reserved staging directory for notifier-side native state.
    ///
    /// `notify` is linked into the binary, so nothing is extracted here today.
    /// `initialize()` still creates it so a misconfigured path fails at startup,
    /// and the watch log names it.
    native_dir: Option<PathBuf>,
    initialized: bool,
}

impl NotifierBackend {
    pub fn new(native_dir: Option<PathBuf>) -> Self {
        Self {
            native_dir,
            initialized: false,
        }
    }

    pub fn native_dir(&self) -> Option<&PathBuf> {
        self.native_dir.as_ref()
    }
}

impl FileWatchBackend for NotifierBackend {
    fn id(&self) -> BackendId {
        BackendId::Notifier
    }

    fn initialize(&mut self) -> Result<(), WatchError> {
        if !super::native::NativeBackend::is_supported() {
            return Err(WatchError::Unsupported {
                backend: BackendId::Notifier,
                reason: format!("notifier library unavailable on {}", std::env::consts::OS),
            });
        }

        if let Some(dir) = &self.native_dir {
            std::fs::create_dir_all(dir).map_err(|e| WatchError::InitFailed {
                reason: format!("cannot prepare native directory {}: {e}", dir.display()),
            })?;
            crate::debug_event!(COMPONENT, "native dir", "{}", dir.display());
        }

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
                backend: BackendId::Notifier,
            });
        }

        let roots = validate_targets(targets);
        let (handle, stop) = WatchHandle::new(BackendId::Notifier);

        let callback_stop = stop.clone();
        let mut renames = RenameTracker::new();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if callback_stop.is_stopped() {
                return;
            }
            match res {
                Ok(event) if is_overflow(&event) => {
                    tracing::warn!("[{COMPONENT}] notifier dropped events; some changes were not reported");
                }
                Ok(event) => {
                    for change in renames.changes(&event, Instant::now()) {
                        if callback_stop.is_stopped() {
                            return;
                        }
                        crate::debug_event!(COMPONENT, change.kind.label(), "{}", change.path.display());
                        deliver(COMPONENT, &on_change, &change);
                    }
                }
                Err(err) => {
                    triage_notify(&err, &callback_stop).report(COMPONENT);
                }
            }
        })?;

        for root in &roots {
            watcher
                .watch(root, RecursiveMode::Recursive)
                .map_err(|e| WatchError::PathWatchFailed {
                    path: root.clone(),
                    reason: e.to_string(),
                })?;
        }

        match &self.native_dir {
            Some(dir) => crate::log_event!(
                COMPONENT,
                "monitoring",
                "{} roots (staging {})",
                roots.len(),
                dir.display()
            ),
            None => crate::log_event!(COMPONENT, "monitoring", "{} roots", roots.len()),
        }

        Ok(handle.with_release(move || release(watcher, roots)))
    }
}

/// Unwatch every root, then drop the library handle so its thread shuts down.
fn release(mut watcher: RecommendedWatcher, roots: Vec<PathBuf>) {
    for root in &roots {
        if let Err(e) = watcher.unwatch(root) {
            crate::debug_event!(COMPONENT, "unwatch failed", "{}: {e}", root.display());
        }
    }
    drop(watcher);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::event::callback;

    #[test]
    fn test_watch_requires_initialize() {
        let backend = NotifierBackend::new(None);
        let result = backend.watch(&[], callback(|_| {}));
        assert!(matches!(result, Err(WatchError::NotInitialized { .. })));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_initialize_creates_native_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let staging = temp.path().join("native/libs");
        let mut backend = NotifierBackend::new(Some(staging.clone()));

        backend.initialize().unwrap();

        assert!(staging.is_dir());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_initialize_fails_when_native_dir_is_a_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let blocker = temp.path().join("native");
        std::fs::write(&blocker, "not a dir").unwrap();
        let mut backend = NotifierBackend::new(Some(blocker.join("libs")));

        assert!(matches!(
            backend.initialize(),
            Err(WatchError::InitFailed { .. })
        ));
    }
}
