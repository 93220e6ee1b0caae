//! Test context and harness for backup-run tests
//!
//! Wires a [`BackupManager`] to mock process, download, upload and mail
//! seams inside a temporary install directory.

use crate::config_builder::ConfigBuilder;
use chrono::{DateTime, Local};
use db_backup_manager::config::Config;
use db_backup_manager::managers::distribution::mock::MockDistributor;
use db_backup_manager::managers::notification::mock::MockNotifier;
use db_backup_manager::utils::download::mock::MockDownloader;
use db_backup_manager::utils::executor::mock::MockExecutor;
use db_backup_manager::utils::tool_provisioner::{Platform, ToolProvisioner};
use db_backup_manager::{BackupManager, DumpExecutor};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test context that owns the temp dir and every mock of one run
pub struct TestContext {
    /// Temporary install directory
    temp_dir: TempDir,
    config: Config,
    pub executor: MockExecutor,
    pub downloader: MockDownloader,
    pub distributor: MockDistributor,
    pub notifier: MockNotifier,
    clock: fn() -> DateTime<Local>,
}

impl TestContext {
    /// Create a context from a builder; downloads fail until replaced
    pub fn from_builder(builder: ConfigBuilder) -> Self {
        let (config, temp_dir) = builder.persist();

        Self {
            temp_dir,
            config,
            executor: MockExecutor::new(),
            downloader: MockDownloader::failing(),
            distributor: MockDistributor::new(),
            notifier: MockNotifier::new(),
            clock: crate::fixtures::fixed_time,
        }
    }

    pub fn with_executor(mut self, executor: MockExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_downloader(mut self, downloader: MockDownloader) -> Self {
        self.downloader = downloader;
        self
    }

    pub fn with_distributor(mut self, distributor: MockDistributor) -> Self {
        self.distributor = distributor;
        self
    }

    pub fn with_notifier(mut self, notifier: MockNotifier) -> Self {
        self.notifier = notifier;
        self
    }

    /// Get the temporary directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `<temp dir>/.config`
    pub fn config_dir(&self) -> PathBuf {
        self.temp_dir.path().join(".config")
    }

    pub fn backup_dir(&self) -> &Path {
        &self.config.backup.local_path
    }

    /// Provisioner that never consults PATH and uses the mock downloader
    pub fn provisioner(&self) -> ToolProvisioner {
        ToolProvisioner::mongodb_tools(&self.config_dir())
            .with_platform(Platform::LinuxX86_64)
            .without_path_search()
            .with_downloader(Box::new(self.downloader.clone()))
    }

    /// Backup manager wired to this context's mocks
    pub fn manager(&self) -> BackupManager {
        let dump = DumpExecutor::new(Box::new(self.executor.clone()), self.provisioner())
            .with_clock(self.clock);

        BackupManager::with_components(
            self.config.clone(),
            dump,
            Box::new(self.distributor.clone()),
            Box::new(self.notifier.clone()),
        )
    }

    /// Names of the files currently in the backup directory, sorted
    pub fn backup_files(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.backup_dir()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    /// Names of the entries in the config dir, sorted
    pub fn config_dir_entries(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.config_dir()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }
}

/// Extension trait for assertion helpers
pub trait ResultAssertions<T> {
    /// Assert that the result is Ok and return the value
    fn assert_ok(self) -> T;

    /// Assert that the result is Err and the error message contains the given string
    fn assert_err_contains(self, needle: &str);
}

impl<T: std::fmt::Debug, E: std::fmt::Debug> ResultAssertions<T> for Result<T, E> {
    fn assert_ok(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    }

    fn assert_err_contains(self, needle: &str) {
        match self {
            Ok(v) => panic!("Expected Err containing '{}', got Ok: {:?}", needle, v),
            Err(e) => {
                let err_msg = format!("{:?}", e);
                assert!(
                    err_msg.contains(needle),
                    "Error '{}' does not contain '{}'",
                    err_msg,
                    needle
                );
            }
        }
    }
}
