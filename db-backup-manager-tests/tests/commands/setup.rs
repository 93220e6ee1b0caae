//! Tests for the 'setup' command
//!
//! Setup writes a default configuration once and prints scheduler hints.

use db_backup_manager::config::{self, init_config};
use db_backup_manager::utils::cron::{cron_entries, windows_task_commands};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use test_utils::ConfigBuilder;

#[test]
fn test_setup_writes_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".config").join("backup_config.json");

    let (config, created) = init_config(&path, dir.path()).unwrap();

    assert!(created);
    assert!(path.exists());
    assert_eq!(config.backup.local_path, dir.path().join("backups"));
    assert_eq!(config.schedule.frequency, "daily");

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["email"]["smtp_port"], 587);
    assert_eq!(json["ftp"]["port"], 21);
    assert_eq!(json["ftp"]["directory"], "/backups");
    assert_eq!(json["database"]["host"], "localhost");
}

#[test]
fn test_setup_never_overwrites() {
    let (_, path, _dir) = ConfigBuilder::mysql().with_ftp("ftp.example.com", 21).write();
    let before = fs::read_to_string(&path).unwrap();

    let (config, created) = init_config(&path, Path::new("/elsewhere")).unwrap();

    assert!(!created);
    assert!(config.ftp.enabled);
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn test_setup_reports_invalid_existing_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("backup_config.json");
    fs::write(&path, "{}").unwrap();

    assert!(matches!(
        init_config(&path, dir.path()),
        Err(config::ConfigError::ParseError(_))
    ));
    assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
}

#[test]
fn test_setup_cron_hint_uses_config_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("backup_config.json");
    let (config, _) = init_config(&path, dir.path()).unwrap();

    let entries = cron_entries(&config.schedule, Path::new("/opt/db/db-backup-manager"), &path);

    assert_eq!(
        entries,
        vec![format!(
            "0 0 * * * /opt/db/db-backup-manager --config {} --run",
            path.display()
        )]
    );
}

#[test]
fn test_setup_windows_hint_uses_config_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom").join("backup_config.json");
    let (config, _) = init_config(&path, dir.path()).unwrap();

    let commands = windows_task_commands(&config.schedule, Path::new("C:/db/dbm.exe"), &path);

    assert_eq!(commands.len(), 1);
    assert!(commands[0].contains(&format!("--config \\\"{}\\\" --run", path.display())));
}
