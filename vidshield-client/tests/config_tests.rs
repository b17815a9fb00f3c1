//! Integration tests for client configuration discovery
//!
//! These tests point XDG_CONFIG_HOME at a temporary directory, so they run
//! serially.

use serial_test::serial;
use std::path::Path;
use vidshield_client::config::{ClientConfig, CONFIG_FILE_NAME};

/// Run `f` with XDG_CONFIG_HOME set to `dir`, restoring the previous value
fn with_config_home<T>(dir: &Path, f: impl FnOnce() -> T) -> T {
    let previous = std::env::var_os("XDG_CONFIG_HOME");
    std::env::set_var("XDG_CONFIG_HOME", dir);
    let result = f();
    match previous {
        Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }
    result
}

#[test]
#[serial]
fn test_user_config_dir_is_searched() {
    let home = tempfile::tempdir().expect("Failed to create temp dir");
    let dir = home.path().join("vidshield");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join(CONFIG_FILE_NAME),
        r#"
api_base_url = "https://vidshield.test"

[redirect]
error_fallback_route = "/dashboard"
error_countdown_seconds = 3

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = with_config_home(home.path(), || ClientConfig::load(None)).unwrap();

    assert_eq!(config.api_base_url, "https://vidshield.test");
    assert_eq!(config.redirect.error_fallback_route, "/dashboard");
    assert_eq!(config.redirect.error_countdown_seconds, 3);
    assert_eq!(config.redirect.completion_delay_ms, 2000);
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn test_explicit_path_wins_over_config_dir() {
    let home = tempfile::tempdir().expect("Failed to create temp dir");
    let dir = home.path().join("vidshield");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(CONFIG_FILE_NAME), "api_base_url = \"http://from-dir\"").unwrap();

    let explicit = home.path().join("other.toml");
    std::fs::write(&explicit, "api_base_url = \"http://explicit\"").unwrap();

    let config = with_config_home(home.path(), || ClientConfig::load(Some(&explicit))).unwrap();
    assert_eq!(config.api_base_url, "http://explicit");
}

#[test]
#[serial]
fn test_invalid_user_config_is_error() {
    let home = tempfile::tempdir().expect("Failed to create temp dir");
    let dir = home.path().join("vidshield");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(CONFIG_FILE_NAME), "[reconnect]\nmax_attempts = \"many\"").unwrap();

    let result = with_config_home(home.path(), || ClientConfig::load(None));
    assert!(matches!(result, Err(vidshield_common::Error::Config(_))));
}
