//! Integration tests for layered configuration loading

use super::test_utils::with_env;
use canvass::config::ConfigLoader;
use canvass::error::ConfigError;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_environment_overrides_workspace_file() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("canvass.toml"),
        r#"
[batch]
max_concurrency = 8

[retry]
max_attempts = 4
base_delay_ms = 500
"#,
    )
    .unwrap();

    let config = with_env(&[("CANVASS__RETRY__MAX_ATTEMPTS", "2")], || {
        ConfigLoader::load_layers(temp_dir.path(), None).unwrap()
    });

    assert_eq!(config.batch.max_concurrency, 8);
    assert_eq!(config.retry.max_attempts, 2);
    assert_eq!(config.retry.base_delay_ms, 500);
}

#[test]
fn test_environment_specific_file_wins_over_base() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("canvass.toml"),
        "[batch]\noutput_root = \"outputs\"\nmax_concurrency = 2\n",
    )
    .unwrap();
    std::fs::create_dir_all(temp_dir.path().join("config")).unwrap();
    std::fs::write(
        temp_dir.path().join("config").join("staging.toml"),
        "[batch]\noutput_root = \"staging-outputs\"\n",
    )
    .unwrap();

    let config = with_env(&[("CANVASS_ENV", "staging")], || {
        ConfigLoader::load_layers(temp_dir.path(), None).unwrap()
    });

    assert_eq!(config.batch.output_root, PathBuf::from("staging-outputs"));
    assert_eq!(config.batch.max_concurrency, 2);
}

#[test]
fn test_invalid_values_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("bad.toml");
    std::fs::write(
        &config_file,
        "[batch]\nmax_concurrency = 0\n\n[retry]\nmax_attempts = 0\n",
    )
    .unwrap();

    let err = with_env(&[], || ConfigLoader::load_from_file(&config_file).unwrap_err());
    match err {
        ConfigError::Invalid(message) => {
            assert!(message.contains("max_concurrency"));
            assert!(message.contains("max_attempts"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = ConfigLoader::load_from_file(&temp_dir.path().join("missing.toml"));
    assert!(matches!(result, Err(ConfigError::Read { .. })));
}
