//! Configuration module for db-backup-manager
//!
//! The configuration is a single JSON document stored next to the installed
//! executable (`<install dir>/.config/backup_config.json`). It is parsed into
//! typed structs and validated once at load time.
//!
//! ## Example Usage
//!
//! ```no_run
//! use db_backup_manager::config;
//!
//! let config = config::load_config("/opt/db-backup/.config/backup_config.json")?;
//! println!("Backing up {:?} to {:?}", config.database.name, config.backup.local_path);
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{init_config, load_config, load_or_default, save_config, ConfigError, Result};
pub use types::*;

use std::path::{Path, PathBuf};

/// Name of the configuration directory inside the install directory
pub const CONFIG_DIR_NAME: &str = ".config";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "backup_config.json";

/// Directory holding the running executable, falling back to the working directory
pub fn install_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Default configuration file path (`<install dir>/.config/backup_config.json`)
pub fn default_config_path() -> PathBuf {
    install_dir().join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// Directory that holds the config file, the tool cache and the logs
pub fn config_dir_for(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(CONFIG_DIR_NAME))
}

/// Expand tilde (~) in path
pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
