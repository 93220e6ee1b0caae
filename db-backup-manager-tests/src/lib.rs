//! Test utilities for db-backup-manager
//!
//! This crate provides shared test utilities, fixtures and a harness that
//! wires the backup manager to the mock implementations exported by the main
//! crate.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, TestContext};
//!
//! #[test]
//! fn my_test() {
//!     let ctx = TestContext::from_builder(ConfigBuilder::mysql());
//!     let outcome = ctx.manager().run();
//!     // ... assertions on ctx.notifier / ctx.distributor
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use test_context::{ResultAssertions, TestContext};

// Re-export types from the main crate for convenience
pub use db_backup_manager::config::{Config, DatabaseConfig, EmailConfig, FtpConfig};
pub use db_backup_manager::target::{BackupArtifact, BackupTarget, Engine, RunOutcome};

// Re-export mock implementations from the main crate
pub use db_backup_manager::managers::distribution::mock::MockDistributor;
pub use db_backup_manager::managers::notification::mock::{MockNotifier, NotifyCall};
pub use db_backup_manager::utils::download::mock::MockDownloader;
pub use db_backup_manager::utils::executor::mock::{MockExecutor, MockResponse};

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
