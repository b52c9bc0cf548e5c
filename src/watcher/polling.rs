//! Polling backend: diff full file snapshots on a fixed interval.
//!
//! Works everywhere, at the cost of latency bounded by the poll interval and a full
//! directory walk per tick.

use std::path::PathBuf;
use std::time::Duration;

use super::backend::{BackendId, FileWatchBackend};
use super::error::WatchError;
use super::event::ChangeCallback;
use super::fault::deliver;
use super::handle::{StopToken, WatchHandle};
use super::snapshot::FileSnapshot;
use super::targets::validate_targets;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Snapshot-diffing watcher.
#[derive(Debug)]
pub struct PollingBackend {
    interval: Duration,
    initialized: bool,
}

impl PollingBackend {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            initialized: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for PollingBackend {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl FileWatchBackend for PollingBackend {
    fn id(&self) -> BackendId {
        BackendId::Polling
    }

    fn initialize(&mut self) -> Result<(), WatchError> {
        if self.interval.is_zero() {
            return Err(WatchError::InitFailed {
                reason: "poll interval must be greater than zero".to_string(),
            });
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
                backend: BackendId::Polling,
            });
        }

        let roots = validate_targets(targets);

        // Baseline is taken before returning so that any change after `watch()`
        // is visible on the first tick.
        let baseline = FileSnapshot::capture(&roots);
        crate::log_event!(
            "polling",
            "monitoring",
            "{} files under {} roots every {}ms",
            baseline.len(),
            roots.len(),
            self.interval.as_millis()
        );

        let (handle, stop) = WatchHandle::new(BackendId::Polling);
        let interval = self.interval;
        let thread = std::thread::Builder::new()
            .name("devreload-polling".to_string())
            .spawn(move || poll_loop(roots, baseline, interval, stop, on_change))
            .map_err(WatchError::Spawn)?;

        Ok(handle.with_thread(thread))
    }
}

fn poll_loop(
    roots: Vec<PathBuf>,
    baseline: FileSnapshot,
    interval: Duration,
    stop: StopToken,
    on_change: ChangeCallback,
) {
    let mut previous = baseline;

    while !stop.wait(interval) {
        let current = FileSnapshot::capture(&roots);

        for change in previous.diff(&current) {
            if stop.is_stopped() {
                return;
            }
            crate::debug_event!("polling", change.kind.label(), "{}", change.path.display());
            deliver("polling", &on_change, &change);
        }

        previous = current;
    }

    crate::debug_event!("polling", "stopped");
}
