//! Database Backup Manager Library
//!
//! Dumps a MySQL or MongoDB database with the engine's native tool, compresses
//! the result into one artifact, optionally uploads it over FTP and reports
//! the outcome by email.

pub mod config;
pub mod managers;
pub mod target;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, load_or_default, save_config, Config, ConfigError};
pub use managers::backup::BackupManager;
pub use managers::dump::{DumpError, DumpExecutor};
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig};
pub use managers::notification::NotificationManager;
pub use target::{BackupArtifact, BackupTarget, Engine, RunOutcome, TargetError};
