//! Configuration loading and validation

use db_backup_manager::config::{self, ConfigError};
use rstest::rstest;
use std::fs;
use tempfile::TempDir;
use test_utils::{legacy_config_json, minimal_config_json, render, ResultAssertions};

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("backup_config.json");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_minimal_config_defaults() {
    let dir = TempDir::new().unwrap();
    let backups = dir.path().join("backups");
    let path = write_config(&dir, &render(minimal_config_json(), &backups));

    let config = config::load_config(&path).assert_ok();

    assert_eq!(config.database.host.as_deref(), Some("localhost"));
    assert_eq!(config.backup.local_path, backups);
    assert_eq!(config.backup.retention_days, 7);
    assert_eq!(config.email.smtp_port, 587);
    assert!(!config.ftp.enabled);
    assert_eq!(config.ftp.directory, "/backups");
    assert_eq!(config.schedule.times, vec!["00:00"]);
}

#[test]
fn test_legacy_config_with_string_port() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, &render(legacy_config_json(), dir.path()));

    let config = config::load_config(&path).assert_ok();

    assert_eq!(config.database.port, Some(27017));
    assert!(!config.email.is_configured());
}

#[rstest]
#[case::ftp_without_host(r#""ftp": {"enabled": true}"#, "ftp.host")]
#[case::smtp_without_recipients(
    r#""email": {"smtp_server": "smtp.example.com", "username": "a@example.com"}"#,
    "recipients"
)]
#[case::smtp_without_username(
    r#""email": {"smtp_server": "smtp.example.com", "recipients": ["ops@example.com"]}"#,
    "username"
)]
fn test_validation_errors(#[case] block: &str, #[case] expected: &str) {
    let dir = TempDir::new().unwrap();
    let contents = format!(
        r#"{{"database": {{"type": "mysql", "name": "orders"}}, "backup": {{"local_path": "/tmp/b"}}, {}}}"#,
        block
    );
    let path = write_config(&dir, &contents);

    match config::load_config(&path) {
        Err(ConfigError::ValidationError(msg)) => assert!(msg.contains(expected), "{}", msg),
        other => panic!("Expected validation error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_empty_local_path_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"{"database": {"type": "mysql"}, "backup": {"local_path": ""}}"#,
    );
    config::load_config(&path).assert_err_contains("local_path");
}

#[test]
fn test_unknown_engine_loads() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"{"database": {"type": "postgres", "name": "x"}, "backup": {"local_path": "/tmp/b"}}"#,
    );
    let config = config::load_config(&path).assert_ok();
    assert_eq!(config.database.db_type.as_deref(), Some("postgres"));
}

#[test]
fn test_malformed_json_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "{ not json");
    assert!(matches!(
        config::load_config(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nope.json");

    assert!(matches!(
        config::load_config(&path),
        Err(ConfigError::NotFound(_))
    ));

    let config = config::load_or_default(&path, dir.path()).assert_ok();
    assert_eq!(config.backup.local_path, dir.path().join("backups"));
}

#[test]
fn test_save_creates_parent_dirs() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".config").join("backup_config.json");

    let config = config::Config::with_defaults(dir.path());
    config::save_config(&path, &config).assert_ok();

    let loaded = config::load_config(&path).assert_ok();
    assert_eq!(loaded.backup.local_path, config.backup.local_path);
    assert_eq!(config::config_dir_for(&path), dir.path().join(".config"));
}
