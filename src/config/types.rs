use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub backup: BackupSettings,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub ftp: FtpConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Database to back up.
///
/// `db_type` stays a plain string here; it is turned into a
/// [`BackupTarget`](crate::target::BackupTarget) when a run starts so that an
/// unknown engine is still reported through a failure notification.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(rename = "type", default)]
    pub db_type: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    /// MongoDB connection URI, takes precedence over the individual parameters
    #[serde(default)]
    pub connection_string: Option<String>,

    #[serde(default = "default_db_host")]
    pub host: Option<String>,

    #[serde(default, deserialize_with = "deserialize_port")]
    pub port: Option<u16>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: None,
            name: None,
            connection_string: None,
            host: default_db_host(),
            port: None,
            username: None,
            password: None,
        }
    }
}

/// Local backup settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackupSettings {
    pub local_path: PathBuf,

    /// Kept for compatibility with existing files, not enforced
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Upper bound for a single dump command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dump_timeout_seconds: Option<u64>,
}

/// SMTP notification settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub smtp_server: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub recipients: Vec<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_server: None,
            smtp_port: default_smtp_port(),
            username: None,
            password: None,
            recipients: Vec::new(),
        }
    }
}

impl EmailConfig {
    /// Whether there is enough configuration to attempt sending mail
    pub fn is_configured(&self) -> bool {
        self.smtp_server.as_deref().is_some_and(|s| !s.is_empty()) && !self.recipients.is_empty()
    }
}

/// Remote FTP upload settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FtpConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_ftp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_ftp_directory")]
    pub directory: String,
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: None,
            port: default_ftp_port(),
            username: None,
            password: None,
            directory: default_ftp_directory(),
        }
    }
}

/// Schedule hints used by `--setup`; runs are triggered by the OS scheduler
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_frequency")]
    pub frequency: String,
    #[serde(default = "default_times")]
    pub times: Vec<String>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            frequency: default_frequency(),
            times: default_times(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// Defaults to `<config dir>/logs`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_max_files")]
    pub max_files: u32,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: None,
            level: default_log_level(),
            max_files: default_log_max_files(),
        }
    }
}

impl Config {
    /// Configuration used when no file exists yet
    pub fn with_defaults(install_dir: &std::path::Path) -> Self {
        Self {
            database: DatabaseConfig::default(),
            backup: BackupSettings {
                local_path: install_dir.join("backups"),
                retention_days: default_retention_days(),
                dump_timeout_seconds: None,
            },
            email: EmailConfig::default(),
            ftp: FtpConfig::default(),
            schedule: ScheduleConfig::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Accept a port either as a JSON number or as a numeric string
fn deserialize_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPort {
        Number(u16),
        Text(String),
    }

    match Option::<RawPort>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawPort::Number(n)) => Ok(Some(n)),
        Some(RawPort::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(RawPort::Text(s)) => s
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid port: {}", s))),
    }
}

// Default value functions

fn default_db_host() -> Option<String> { Some("localhost".to_string()) }
fn default_retention_days() -> u32 { 7 }
fn default_smtp_port() -> u16 { 587 }
fn default_ftp_port() -> u16 { 21 }
fn default_ftp_directory() -> String { "/backups".to_string() }
fn default_frequency() -> String { "daily".to_string() }
fn default_times() -> Vec<String> { vec!["00:00".to_string()] }
fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
