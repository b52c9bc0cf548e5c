//! Error triage for detection loops.
//!
//! Loops never bubble errors to the host. Each failure is classified:
//!
//! - [`LoopFault::Shutdown`]: the error arrived after `close()`; exit quietly.
//! - [`LoopFault::Transient`]: log and keep looping (a watched directory vanished,
//!   a watch limit was hit, a callback panicked).
//! - [`LoopFault::Fatal`]: the event source is unusable; log and end the loop. The
//!   loop's owned resources are released by `Drop` on the way out.

use std::any::Any;
use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};

use super::event::{ChangeCallback, ChangeEvent};
use super::handle::StopToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopFault {
    Shutdown,
    Transient(String),
    Fatal(String),
}

impl LoopFault {
    /// Log the fault. Returns true if the loop should keep running.
    pub fn report(&self, component: &str) -> bool {
        match self {
            LoopFault::Shutdown => {
                crate::debug_event!(component, "shutdown during detection cycle");
                false
            }
            LoopFault::Transient(details) => {
                tracing::warn!("[{component}] {details}");
                true
            }
            LoopFault::Fatal(details) => {
                tracing::error!("[{component}] detection loop stopped: {details}");
                false
            }
        }
    }
}

/// Classify an error reported by `notify`.
pub fn triage_notify(err: &notify::Error, stop: &StopToken) -> LoopFault {
    use notify::ErrorKind;

    if stop.is_stopped() {
        return LoopFault::Shutdown;
    }

    match &err.kind {
        ErrorKind::PathNotFound | ErrorKind::WatchNotFound => {
            LoopFault::Transient(format!("watched path went away: {err}"))
        }
        ErrorKind::MaxFilesWatch => LoopFault::Transient(format!(
            "OS watch limit reached, some changes may be missed: {err}"
        )),
        ErrorKind::Io(io_err) => triage_io(io_err, stop),
        ErrorKind::Generic(_) => LoopFault::Transient(err.to_string()),
        ErrorKind::InvalidConfig(_) => LoopFault::Fatal(err.to_string()),
        #[allow(unreachable_patterns)]
        _ => LoopFault::Transient(err.to_string()),
    }
}

/// Classify a plain I/O error raised inside a detection cycle.
pub fn triage_io(err: &io::Error, stop: &StopToken) -> LoopFault {
    if stop.is_stopped() {
        return LoopFault::Shutdown;
    }

    match err.kind() {
        io::ErrorKind::OutOfMemory | io::ErrorKind::Unsupported => {
            LoopFault::Fatal(err.to_string())
        }
        _ => LoopFault::Transient(err.to_string()),
    }
}

/// Invoke the callback, containing a panic so one bad event cannot end the loop.
pub fn deliver(component: &str, on_change: &ChangeCallback, event: &ChangeEvent) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(|| on_change(event))) {
        let fault = LoopFault::Transient(format!(
            "change callback panicked for {}: {}",
            event.path.display(),
            panic_message(&panic)
        ));
        fault.report(component);
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> &str {
    panic
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(|s| s.as_str()))
        .unwrap_or("<non-string panic>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::BackendId;
    use crate::watcher::handle::WatchHandle;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_errors_after_close_are_shutdown() {
        let (handle, token) = WatchHandle::new(BackendId::Native);
        let err = notify::Error::path_not_found();
        assert!(matches!(triage_notify(&err, &token), LoopFault::Transient(_)));

        handle.close();
        assert_eq!(triage_notify(&err, &token), LoopFault::Shutdown);
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let (_handle, token) = WatchHandle::new(BackendId::Notifier);
        let err = notify::Error::new(notify::ErrorKind::InvalidConfig(notify::Config::default()));
        let fault = triage_notify(&err, &token);
        assert!(matches!(fault, LoopFault::Fatal(_)));
        assert!(!fault.report("test"));
    }

    #[test]
    fn test_deliver_contains_panics() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let on_change: ChangeCallback = Arc::new(move |_event: &ChangeEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
            panic!("boom");
        });

        deliver("test", &on_change, &ChangeEvent::modified("/tmp/x"));
        deliver("test", &on_change, &ChangeEvent::modified("/tmp/y"));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
