//! File watching with interchangeable backends.
//!
//! Every backend implements [`FileWatchBackend`] and reports changes through the same
//! [`ChangeCallback`]: one call per detected change, from a background thread. No
//! backend-specific type crosses this boundary.
//!
//! # Architecture
//!
//! ```text
//! WatchCoordinator
//!   - create_backend(config)  -> Box<dyn FileWatchBackend>
//!   - initialize()            -> fatal on failure
//!   - watch(targets, cb)      -> WatchHandle (idempotent close)
//!         |
//!    +----------+-----------+-----------+
//!    |          |           |           |
//! Polling    Native      Notifier
//! (snapshot  (per-dir    (recursive
//!  diff)      OS events)  library)
//! ```

mod backend;
mod coordinator;
mod error;
mod event;
mod fault;
mod handle;
mod native;
mod notifier;
mod pending;
mod polling;
mod snapshot;
mod targets;
mod translate;

pub use backend::{BackendId, FileWatchBackend, create_backend};
pub use coordinator::{WatchCoordinator, WatchCoordinatorBuilder};
pub use error::WatchError;
pub use event::{ChangeCallback, ChangeEvent, ChangeKind, callback};
pub use fault::LoopFault;
pub use handle::WatchHandle;
pub use native::NativeBackend;
pub use notifier::NotifierBackend;
pub use pending::PendingChanges;
pub use polling::{DEFAULT_POLL_INTERVAL, PollingBackend};
pub use snapshot::FileSnapshot;
pub use targets::{directories_under, validate_targets};
