//! Watch handles and the stop token shared with detection loops.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use super::BackendId;

type Release = Box<dyn FnOnce() + Send + 'static>;

/// Stop side of a handle, owned by a backend's detection loop.
#[derive(Clone)]
pub struct StopToken {
    closed: Arc<AtomicBool>,
    rx: Receiver<()>,
}

impl StopToken {
    /// True once `close()` has been requested.
    pub fn is_stopped(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Block for up to `timeout`. Returns true if a stop was requested meanwhile.
    pub fn wait(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => self.is_stopped(),
            // Nothing is ever sent; the sender is dropped on close.
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        }
    }

    /// Receiver that becomes disconnected on close, for use in `select!`.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}

/// Handle to an active watch.
///
/// `close()` is idempotent and may be called from any thread, including while the
/// detection loop is in the middle of a cycle. Dropping the handle closes it.
pub struct WatchHandle {
    backend: BackendId,
    closed: Arc<AtomicBool>,
    stop_tx: Mutex<Option<Sender<()>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    release: Mutex<Option<Release>>,
}

impl WatchHandle {
    /// Create a handle and the stop token its detection loop should observe.
    pub(crate) fn new(backend: BackendId) -> (Self, StopToken) {
        let (tx, rx) = crossbeam_channel::bounded(0);
        let closed = Arc::new(AtomicBool::new(false));
        let token = StopToken {
            closed: Arc::clone(&closed),
            rx,
        };
        let handle = Self {
            backend,
            closed,
            stop_tx: Mutex::new(Some(tx)),
            thread: Mutex::new(None),
            release: Mutex::new(None),
        };
        (handle, token)
    }

    /// Attach the detection loop thread, joined on close.
    pub(crate) fn with_thread(self, thread: JoinHandle<()>) -> Self {
        *self.thread.lock() = Some(thread);
        self
    }

    /// Attach a cleanup action run exactly once on close.
    pub(crate) fn with_release(self, release: impl FnOnce() + Send + 'static) -> Self {
        *self.release.lock() = Some(Box::new(release));
        self
    }

    /// Backend that produced this handle.
    pub fn backend(&self) -> BackendId {
        self.backend
    }

    /// True once `close()` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stop watching and release backend resources.
    ///
    /// Callbacks already running may finish; no new callbacks are scheduled afterwards.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        // Disconnects the loop's stop receiver.
        drop(self.stop_tx.lock().take());

        if let Some(release) = self.release.lock().take() {
            release();
        }

        let thread = self.thread.lock().take();
        if let Some(thread) = thread {
            // A callback closing its own handle must not join itself.
            if thread.thread().id() == std::thread::current().id() {
                return;
            }
            if thread.join().is_err() {
                tracing::warn!("[watcher] {} detection loop panicked", self.backend);
            }
        }

        crate::debug_event!("watcher", "closed", "{}", self.backend);
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("backend", &self.backend)
            .field("closed", &self.is_closed())
            .finish()
    }
}
