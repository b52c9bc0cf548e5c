//! Error types for the file watcher system.

use std::path::PathBuf;
use thiserror::Error;

use super::BackendId;

/// Errors from watcher operations.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Watcher backend '{backend}' is not supported here: {reason}")]
    Unsupported { backend: BackendId, reason: String },

    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Watcher backend '{backend}' was used before initialize()")]
    NotInitialized { backend: BackendId },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("Failed to spawn detection loop: {0}")]
    Spawn(#[source] std::io::Error),
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
