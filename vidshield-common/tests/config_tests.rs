//! Integration tests for config file loading
//!
//! Tests cover:
//! - Missing config files degrade to defaults
//! - Explicit paths are read and parsed
//! - Unparsable files surface a Config error

use serde::Deserialize;
use std::io::Write;
use vidshield_common::config::{load_toml_config, LoggingConfig};
use vidshield_common::Error;

#[derive(Debug, Default, Deserialize)]
struct SampleConfig {
    #[serde(default)]
    api_base_url: Option<String>,
    #[serde(default)]
    logging: LoggingConfig,
}

#[test]
fn test_explicit_path_is_loaded() {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    writeln!(
        file,
        "api_base_url = \"http://worker:9000\"\n\n[logging]\nlevel = \"debug\""
    )
    .unwrap();

    let config: SampleConfig = load_toml_config(Some(file.path()), "client.toml").unwrap();
    assert_eq!(config.api_base_url.as_deref(), Some("http://worker:9000"));
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_missing_explicit_path_is_config_error() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let missing = dir.path().join("absent.toml");

    let result: Result<SampleConfig, Error> = load_toml_config(Some(&missing), "client.toml");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_unparsable_file_is_config_error() {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    writeln!(file, "api_base_url = [unterminated").unwrap();

    let result: Result<SampleConfig, Error> = load_toml_config(Some(file.path()), "client.toml");
    match result {
        Err(Error::Config(msg)) => assert!(msg.contains("Parse")),
        other => panic!("Expected Config error, got {:?}", other),
    }
}

#[test]
fn test_unknown_file_name_falls_back_to_defaults() {
    let config: SampleConfig =
        load_toml_config(None, "vidshield-test-never-present-7f3a.toml").unwrap();
    assert!(config.api_base_url.is_none());
    assert_eq!(config.logging, LoggingConfig::default());
}
