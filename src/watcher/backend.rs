//! The watcher contract and backend selection.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::WatchError;
use super::event::ChangeCallback;
use super::handle::WatchHandle;
use super::native::NativeBackend;
use super::notifier::NotifierBackend;
use super::polling::PollingBackend;
use crate::config::WatcherConfig;

/// Identifies one of the interchangeable watcher implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendId {
    /// Periodic snapshot diffing.
    Polling,
    /// OS event queue with per-directory registrations.
    Native,
    /// Recursive native notifier library.
    Notifier,
}

impl BackendId {
    pub const ALL: [BackendId; 3] = [BackendId::Polling, BackendId::Native, BackendId::Notifier];

    pub fn as_str(self) -> &'static str {
        match self {
            BackendId::Polling => "polling",
            BackendId::Native => "native",
            BackendId::Notifier => "notifier",
        }
    }

    /// Default for the current platform: the OS event API where it is reliable,
    /// else the notifier library, else polling.
    pub fn platform_default() -> Self {
        if cfg!(any(target_os = "linux", target_os = "android", target_os = "windows")) {
            BackendId::Native
        } else if cfg!(target_os = "macos") {
            BackendId::Notifier
        } else {
            BackendId::Polling
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "polling" | "poll" => Ok(BackendId::Polling),
            "native" | "os" => Ok(BackendId::Native),
            "notifier" | "notify" => Ok(BackendId::Notifier),
            other => Err(format!(
                "unknown watcher backend '{other}' (expected polling, native or notifier)"
            )),
        }
    }
}

/// A file watching strategy.
///
/// All backends honour the same contract: after [`initialize`](Self::initialize)
/// succeeds, [`watch`](Self::watch) validates the targets, starts a background
/// detection loop and calls `on_change` once per detected change until the returned
/// handle is closed.
pub trait FileWatchBackend: Send + Sync {
    /// Which implementation this is.
    fn id(&self) -> BackendId;

    /// Prepare backend resources. Failure is fatal: the backend cannot be used.
    fn initialize(&mut self) -> Result<(), WatchError>;

    /// Start watching `targets` recursively.
    ///
    /// Targets that are missing or not directories are skipped with a warning.
    fn watch(
        &self,
        targets: &[PathBuf],
        on_change: ChangeCallback,
    ) -> Result<WatchHandle, WatchError>;
}

/// Build the backend selected by `config` (or the platform default).
///
/// The returned backend is not yet initialized.
pub fn create_backend(config: &WatcherConfig) -> Box<dyn FileWatchBackend> {
    let id = config.backend.unwrap_or_else(BackendId::platform_default);
    crate::debug_event!("watcher", "selected backend", "{id}");

    match id {
        BackendId::Polling => Box::new(PollingBackend::new(config.poll_interval())),
        BackendId::Native => Box::new(NativeBackend::new()),
        BackendId::Notifier => Box::new(NotifierBackend::new(config.native_dir.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_ids() {
        assert_eq!("polling".parse::<BackendId>(), Ok(BackendId::Polling));
        assert_eq!(" Native ".parse::<BackendId>(), Ok(BackendId::Native));
        assert_eq!("notify".parse::<BackendId>(), Ok(BackendId::Notifier));
        assert!("jnotify2".parse::<BackendId>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for id in BackendId::ALL {
            assert_eq!(id.to_string().parse::<BackendId>(), Ok(id));
        }
    }

    #[test]
    fn test_create_backend_honours_config() {
        let config = WatcherConfig {
            backend: Some(BackendId::Polling),
            ..WatcherConfig::default()
        };
        assert_eq!(create_backend(&config).id(), BackendId::Polling);

        let config = WatcherConfig {
            backend: None,
            ..WatcherConfig::default()
        };
        assert_eq!(create_backend(&config).id(), BackendId::platform_default());
    }
}
