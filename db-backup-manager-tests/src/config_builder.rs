//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating test configurations with sensible defaults.

use db_backup_manager::config::{
    save_config, Config, DatabaseConfig, EmailConfig, FtpConfig, CONFIG_DIR_NAME, CONFIG_FILE_NAME,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    config: Config,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder with defaults rooted in a fresh temp dir
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = Config::with_defaults(temp_dir.path());
        config.logging.directory = Some(temp_dir.path().join("logs"));

        Self { temp_dir, config }
    }

    /// MySQL target `orders` on localhost with root credentials
    pub fn mysql() -> Self {
        Self::new().with_database(DatabaseConfig {
            db_type: Some("mysql".to_string()),
            name: Some("orders".to_string()),
            username: Some("root".to_string()),
            password: Some("secret".to_string()),
            ..DatabaseConfig::default()
        })
    }

    /// MongoDB target reached through a connection URI
    pub fn mongodb_uri(uri: &str) -> Self {
        Self::new().with_database(DatabaseConfig {
            db_type: Some("mongodb".to_string()),
            connection_string: Some(uri.to_string()),
            ..DatabaseConfig::default()
        })
    }

    /// MongoDB target reached through host/port parameters
    pub fn mongodb_params(name: &str, port: u16) -> Self {
        Self::new().with_database(DatabaseConfig {
            db_type: Some("mongodb".to_string()),
            name: Some(name.to_string()),
            port: Some(port),
            ..DatabaseConfig::default()
        })
    }

    pub fn with_database(mut self, database: DatabaseConfig) -> Self {
        self.config.database = database;
        self
    }

    /// Override the engine identifier
    pub fn with_db_type(mut self, db_type: &str) -> Self {
        self.config.database.db_type = Some(db_type.to_string());
        self
    }

    pub fn with_local_path(mut self, path: &Path) -> Self {
        self.config.backup.local_path = path.to_path_buf();
        self
    }

    pub fn with_dump_timeout(mut self, seconds: u64) -> Self {
        self.config.backup.dump_timeout_seconds = Some(seconds);
        self
    }

    /// Enable FTP upload to `host`
    pub fn with_ftp(mut self, host: &str, port: u16) -> Self {
        self.config.ftp = FtpConfig {
            enabled: true,
            host: Some(host.to_string()),
            port,
            username: Some("backup".to_string()),
            password: Some("secret".to_string()),
            ..FtpConfig::default()
        };
        self
    }

    /// Configure SMTP notifications to `recipients`
    pub fn with_email(mut self, server: &str, recipients: &[&str]) -> Self {
        self.config.email = EmailConfig {
            smtp_server: Some(server.to_string()),
            username: Some("backup@example.com".to_string()),
            password: Some("secret".to_string()),
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
            ..EmailConfig::default()
        };
        self
    }

    /// Get the temp directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// `<temp dir>/.config`, holding the config file and tool cache
    pub fn config_dir(&self) -> PathBuf {
        self.temp_dir.path().join(CONFIG_DIR_NAME)
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir().join(CONFIG_FILE_NAME)
    }

    /// Output directory for artifacts
    pub fn backup_dir(&self) -> &Path {
        &self.config.backup.local_path
    }

    /// Build the Config
    pub fn build(self) -> Config {
        self.config
    }

    /// Keep the temp directory (don't delete on drop)
    pub fn persist(self) -> (Config, TempDir) {
        (self.config, self.temp_dir)
    }

    /// Save the config to `config_path()` and keep the temp dir
    pub fn write(self) -> (Config, PathBuf, TempDir) {
        let path = self.config_path();
        fs::create_dir_all(self.config_dir()).expect("Failed to create config dir");
        save_config(&path, &self.config).expect("Failed to write config");
        (self.config, path, self.temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
