use super::types::*;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Config file not found: {0:?}")]
    NotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load and validate configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let contents = fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Load the configuration, falling back to defaults when the file is absent
pub fn load_or_default<P: AsRef<Path>>(path: P, install_dir: &Path) -> Result<Config> {
    match load_config(path) {
        Err(ConfigError::NotFound(_)) => Ok(Config::with_defaults(install_dir)),
        other => other,
    }
}

/// Write the configuration as pretty-printed JSON
pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let contents = serde_json::to_string_pretty(config)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Write the default configuration unless a file already exists.
///
/// Returns the configuration now on disk and whether it was created.
pub fn init_config<P: AsRef<Path>>(path: P, install_dir: &Path) -> Result<(Config, bool)> {
    let path = path.as_ref();
    if path.exists() {
        return Ok((load_config(path)?, false));
    }

    let config = Config::with_defaults(install_dir);
    save_config(path, &config)?;
    Ok((config, true))
}

/// Validate the configuration
pub(crate) fn validate_config(config: &Config) -> Result<()> {
    if config.backup.local_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "backup.local_path must not be empty".to_string(),
        ));
    }

    if config.ftp.enabled && is_blank(&config.ftp.host) {
        return Err(ConfigError::ValidationError(
            "ftp.enabled is set but ftp.host is missing".to_string(),
        ));
    }

    if !is_blank(&config.email.smtp_server) {
        if config.email.recipients.is_empty() {
            return Err(ConfigError::ValidationError(
                "email.smtp_server is set but email.recipients is empty".to_string(),
            ));
        }
        if is_blank(&config.email.username) {
            return Err(ConfigError::ValidationError(
                "email.smtp_server is set but email.username is missing".to_string(),
            ));
        }
    }

    Ok(())
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}
