//! Shared collector for change events.
//!
//! Hosts that only need to know *that* something changed can hand a
//! [`PendingChanges`] to a backend as its callback, then drain batches when the tree
//! has been quiet for a while (editors often save the same file several times in a row).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::event::{ChangeCallback, ChangeEvent, ChangeKind};

#[derive(Debug)]
struct Pending {
    kind: ChangeKind,
    at: Instant,
}

/// Thread-safe set of paths changed since the last drain.
#[derive(Debug, Clone)]
pub struct PendingChanges {
    inner: Arc<Mutex<HashMap<PathBuf, Pending>>>,
    quiet: Duration,
}

impl PendingChanges {
    /// Create a collector whose batches become ready after `quiet` without new events.
    pub fn new(quiet: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            quiet,
        }
    }

    /// Record a change, keeping the most recent kind per path.
    pub fn record(&self, event: &ChangeEvent) {
        self.inner.lock().insert(
            event.path.clone(),
            Pending {
                kind: event.kind,
                at: Instant::now(),
            },
        );
    }

    /// A callback that records into this collector.
    pub fn callback(&self) -> ChangeCallback {
        let this = self.clone();
        Arc::new(move |event: &ChangeEvent| this.record(event))
    }

    /// Take everything if no change arrived during the quiet period.
    ///
    /// Returns `None` while changes are still arriving or nothing is pending.
    pub fn take_ready(&self) -> Option<Vec<ChangeEvent>> {
        let mut pending = self.inner.lock();
        let newest = pending.values().map(|p| p.at).max()?;
        if newest.elapsed() < self.quiet {
            return None;
        }
        Some(drain_sorted(&mut pending))
    }

    /// Take everything regardless of timing.
    pub fn take_all(&self) -> Vec<ChangeEvent> {
        drain_sorted(&mut self.inner.lock())
    }

    pub fn has_pending(&self) -> bool {
        !self.inner.lock().is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().len()
    }
}

fn drain_sorted(pending: &mut HashMap<PathBuf, Pending>) -> Vec<ChangeEvent> {
    let mut out: Vec<ChangeEvent> = pending
        .drain()
        .map(|(path, p)| ChangeEvent::new(path, p.kind))
        .collect();
    out.sort_by(|a, b| a.path.cmp(&b.path));
    out
}
