//! Development-mode hot-reload coordination.
//!
//! - [`watcher`]: interchangeable file watching backends behind one callback contract
//! - [`reload`]: serialized rebuilds producing versioned, immutable code-loading scopes
//! - [`mapping`]: positions in generated sources mapped back to the original files

pub mod cli;
pub mod config;
pub mod logging;
pub mod mapping;
pub mod reload;
pub mod watcher;

pub use config::Settings;
pub use mapping::{GeneratedPosition, PositionMapper, SourceMapper, SourcePosition};
pub use reload::{BuildOutcome, Builder, CodeScope, VersionManager};
pub use watcher::{BackendId, ChangeEvent, ChangeKind, WatchCoordinator, WatchError};
