//! Watch coordinator: owns one backend and its active watch.

use std::path::PathBuf;
use std::time::Duration;

use super::backend::{BackendId, FileWatchBackend, create_backend};
use super::error::WatchError;
use super::event::{ChangeCallback, ChangeEvent};
use super::handle::WatchHandle;
use crate::config::WatcherConfig;

/// Runs a single watcher backend over a set of roots.
///
/// The backend's detection loop runs on its own background thread and calls the
/// change callback once per detected change. Dropping the coordinator closes the watch.
pub struct WatchCoordinator {
    backend: Box<dyn FileWatchBackend>,
    handle: WatchHandle,
    targets: Vec<PathBuf>,
}

impl WatchCoordinator {
    /// Create a builder for configuring the coordinator.
    pub fn builder() -> WatchCoordinatorBuilder {
        WatchCoordinatorBuilder::new()
    }

    /// Select and initialize the backend named by `config`, then start watching.
    pub fn start(
        config: &WatcherConfig,
        targets: Vec<PathBuf>,
        on_change: ChangeCallback,
    ) -> Result<Self, WatchError> {
        let mut backend = create_backend(config);
        backend.initialize()?;
        Self::start_with(backend, targets, on_change)
    }

    /// Start watching with an already initialized backend.
    pub fn start_with(
        backend: Box<dyn FileWatchBackend>,
        targets: Vec<PathBuf>,
        on_change: ChangeCallback,
    ) -> Result<Self, WatchError> {
        let handle = backend.watch(&targets, on_change)?;
        crate::log_event!("watcher", "started", "{} backend", backend.id());

        Ok(Self {
            backend,
            handle,
            targets,
        })
    }

    pub fn backend(&self) -> BackendId {
        self.backend.id()
    }

    /// Targets as submitted (including any that were rejected).
    pub fn targets(&self) -> &[PathBuf] {
        &self.targets
    }

    pub fn handle(&self) -> &WatchHandle {
        &self.handle
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    /// Stop watching. Safe to call more than once.
    pub fn close(&self) {
        self.handle.close();
    }
}

impl std::fmt::Debug for WatchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchCoordinator")
            .field("backend", &self.backend.id())
            .field("targets", &self.targets)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Builder for constructing a [`WatchCoordinator`].
pub struct WatchCoordinatorBuilder {
    config: WatcherConfig,
    targets: Vec<PathBuf>,
    on_change: Option<ChangeCallback>,
}

impl WatchCoordinatorBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            config: WatcherConfig::default(),
            targets: Vec::new(),
            on_change: None,
        }
    }

    /// Start from an existing watcher configuration.
    pub fn config(mut self, config: WatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Force a specific backend instead of the platform default.
    pub fn backend(mut self, backend: BackendId) -> Self {
        self.config.backend = Some(backend);
        self
    }

    /// Set the polling interval (polling backend only).
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Add a directory to watch.
    pub fn target(mut self, path: impl Into<PathBuf>) -> Self {
        self.targets.push(path.into());
        self
    }

    /// Add several directories to watch.
    pub fn targets(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.targets.extend(paths);
        self
    }

    /// Set the change callback.
    pub fn on_change<F>(mut self, f: F) -> Self
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.on_change = Some(std::sync::Arc::new(f));
        self
    }

    /// Set a shared change callback.
    pub fn callback(mut self, callback: ChangeCallback) -> Self {
        self.on_change = Some(callback);
        self
    }

    /// Initialize the backend and start watching.
    pub fn start(self) -> Result<WatchCoordinator, WatchError> {
        let on_change = self.on_change.ok_or_else(|| WatchError::InitFailed {
            reason: "Change callback is required".to_string(),
        })?;
        WatchCoordinator::start(&self.config, self.targets, on_change)
    }
}

impl Default for WatchCoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
