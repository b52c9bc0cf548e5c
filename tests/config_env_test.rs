use devreload::{BackendId, Settings};
use std::env;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_env_override_with_double_underscore() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    fs::write(&config_path, "[watcher]\npoll_interval_ms = 500\n").unwrap();

    unsafe {
        // Double underscore separates nested levels
        env::set_var("DEVRELOAD_WATCHER__POLL_INTERVAL_MS", "250");
        env::set_var("DEVRELOAD_WATCHER__BACKEND", "polling");
    }

    let settings = Settings::load_from(&config_path).unwrap();

    unsafe {
        env::remove_var("DEVRELOAD_WATCHER__POLL_INTERVAL_MS");
        env::remove_var("DEVRELOAD_WATCHER__BACKEND");
    }

    // Environment wins over the file
    assert_eq!(settings.watcher.poll_interval_ms, 250);
    assert_eq!(settings.watcher.backend, Some(BackendId::Polling));
}

#[test]
fn test_env_override_reload_section() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    fs::write(&config_path, "[reload]\nartifact_extension = \"bin\"\n").unwrap();

    unsafe {
        env::set_var("DEVRELOAD_RELOAD__DELEGATE_RESOURCES", "true");
    }

    let settings = Settings::load_from(&config_path).unwrap();

    unsafe {
        env::remove_var("DEVRELOAD_RELOAD__DELEGATE_RESOURCES");
    }

    assert!(settings.reload.delegate_resources);
    assert_eq!(settings.reload.artifact_extension, "bin");
}
