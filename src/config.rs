//! Configuration module for the hot-reload coordinator.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`.devreload/settings.toml`)
//! - Environment variable overrides
//! - CLI argument overrides (applied by the caller)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `DEVRELOAD_` and use double underscores
//! to separate nested levels:
//! - `DEVRELOAD_WATCHER__BACKEND=polling` sets `watcher.backend`
//! - `DEVRELOAD_WATCHER__POLL_INTERVAL_MS=250` sets `watcher.poll_interval_ms`
//! - `DEVRELOAD_RELOAD__DELEGATE_RESOURCES=true` sets `reload.delegate_resources`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::watcher::BackendId;

const CONFIG_DIR: &str = ".devreload";
const CONFIG_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "DEVRELOAD_";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Project root (where .devreload is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// File watching
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Reload protocol and code-loading scopes
    #[serde(default)]
    pub reload: ReloadConfig,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatcherConfig {
    /// Backend to use; platform default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendId>,

    /// Polling backend tick interval
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Staging directory reserved for the notifier backend; created on initialize
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_dir: Option<PathBuf>,

    /// Directories to watch, relative to the workspace root
    #[serde(default = "default_targets")]
    pub targets: Vec<PathBuf>,

    /// How long the tree must be quiet before a batch of changes is handed out
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ReloadConfig {
    /// File extension of compiled artifacts inside output directories
    #[serde(default = "default_artifact_extension")]
    pub artifact_extension: String,

    /// Stable parent resolution directories, fixed at startup
    #[serde(default)]
    pub parent_dirs: Vec<PathBuf>,

    /// Resolve resources from the parent only, never from per-build output
    #[serde(default = "default_false")]
    pub delegate_resources: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `watcher = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_false() -> bool {
    false
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_quiet_period_ms() -> u64 {
    100
}
fn default_targets() -> Vec<PathBuf> {
    vec![PathBuf::from("app"), PathBuf::from("conf")]
}
fn default_artifact_extension() -> String {
    "class".to_string()
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            workspace_root: None,
            watcher: WatcherConfig::default(),
            reload: ReloadConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            backend: None,
            poll_interval_ms: default_poll_interval_ms(),
            native_dir: None,
            targets: default_targets(),
            quiet_period_ms: default_quiet_period_ms(),
        }
    }
}

impl WatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    /// Backend that will actually be used.
    pub fn effective_backend(&self) -> BackendId {
        self.backend.unwrap_or_else(BackendId::platform_default)
    }

    /// Watch targets resolved against `root`.
    pub fn resolved_targets(&self, root: &Path) -> Vec<PathBuf> {
        self.targets
            .iter()
            .map(|t| if t.is_absolute() { t.clone() } else { root.join(t) })
            .collect()
    }
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            artifact_extension: default_artifact_extension(),
            parent_dirs: Vec::new(),
            delegate_resources: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Self::figment(config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file (env overrides still apply)
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref().to_path_buf())
            .extract()
            .map_err(Box::new)
    }

    fn figment(config_path: PathBuf) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(config_path))
            // Double underscore (__) separates nested levels
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
    }

    /// Find `.devreload/settings.toml` from the current directory upwards
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Directory holding `.devreload`, searched from the current directory upwards
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Workspace root, falling back to the current directory
    pub fn project_root(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        let mut settings = Settings::default();
        if let Ok(current_dir) = std::env::current_dir() {
            settings.workspace_root = Some(current_dir);
        }

        settings.save(&config_path)?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.watcher.poll_interval_ms, 1000);
        assert_eq!(settings.watcher.poll_interval(), Duration::from_secs(1));
        assert!(settings.watcher.backend.is_none());
        assert_eq!(settings.reload.artifact_extension, "class");
        assert!(!settings.reload.delegate_resources);
        assert_eq!(settings.logging.default, "warn");
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
version = 2

[watcher]
backend = "polling"
poll_interval_ms = 250
native_dir = "/tmp/devreload-native"
targets = ["app/views"]

[reload]
parent_dirs = ["lib/classes"]
delegate_resources = true

[logging]
default = "info"

[logging.modules]
watcher = "debug"
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.version, 2);
        assert_eq!(settings.watcher.backend, Some(BackendId::Polling));
        assert_eq!(settings.watcher.poll_interval_ms, 250);
        assert_eq!(
            settings.watcher.native_dir,
            Some(PathBuf::from("/tmp/devreload-native"))
        );
        assert_eq!(settings.watcher.targets, vec![PathBuf::from("app/views")]);
        assert_eq!(settings.reload.parent_dirs, vec![PathBuf::from("lib/classes")]);
        assert!(settings.reload.delegate_resources);
        assert_eq!(settings.logging.default, "info");
        assert_eq!(settings.logging.modules["watcher"], "debug");
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(".devreload/settings.toml");

        let mut settings = Settings::default();
        settings.watcher.backend = Some(BackendId::Notifier);
        settings.watcher.poll_interval_ms = 42;

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.watcher.backend, Some(BackendId::Notifier));
        assert_eq!(loaded.watcher.poll_interval_ms, 42);
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        fs::write(&config_path, "[reload]\nartifact_extension = \"bin\"\n").unwrap();

        let settings = Settings::load_from(&config_path).unwrap();

        assert_eq!(settings.reload.artifact_extension, "bin");
        // Defaults for everything else
        assert_eq!(settings.watcher.poll_interval_ms, 1000);
        assert_eq!(settings.watcher.targets, default_targets());
    }

    #[test]
    fn test_resolved_targets() {
        let config = WatcherConfig {
            targets: vec![PathBuf::from("app"), PathBuf::from("/abs/conf")],
            ..WatcherConfig::default()
        };
        assert_eq!(
            config.resolved_targets(Path::new("/project")),
            vec![PathBuf::from("/project/app"), PathBuf::from("/abs/conf")]
        );
    }
}
