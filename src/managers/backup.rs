//! Backup manager - orchestrates one backup run
//!
//! A run resolves the configured target, dumps and packages it, hands the
//! artifact to the distributor and finally reports the outcome. Exactly one
//! notification is attempted per run, whatever happens before it.

use crate::config::{expand_tilde, Config};
use crate::managers::distribution::{ArtifactDistributor, FtpDistributor};
use crate::managers::dump::DumpExecutor;
use crate::managers::notification::{NotificationManager, StatusNotifier};
use crate::target::{BackupTarget, RunOutcome};
use crate::utils::executor::RealExecutor;
use crate::utils::tool_provisioner::ToolProvisioner;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

pub struct BackupManager {
    config: Config,
    dump_executor: DumpExecutor,
    distributor: Box<dyn ArtifactDistributor>,
    notifier: Box<dyn StatusNotifier>,
}

impl BackupManager {
    /// Create a backup manager wired to the real tools, FTP and SMTP.
    ///
    /// `config_dir` holds the tool cache.
    pub fn new(config: Config, config_dir: &Path) -> Self {
        let timeout = config.backup.dump_timeout_seconds.map(Duration::from_secs);
        let dump_executor = DumpExecutor::new(
            Box::new(RealExecutor::new()),
            ToolProvisioner::mongodb_tools(config_dir),
        )
        .with_timeout(timeout);

        let distributor = Box::new(FtpDistributor::new(config.ftp.clone()));
        let notifier = Box::new(NotificationManager::new(config.email.clone()));

        Self::with_components(config, dump_executor, distributor, notifier)
    }

    /// Create a backup manager from explicit components
    pub fn with_components(
        config: Config,
        dump_executor: DumpExecutor,
        distributor: Box<dyn ArtifactDistributor>,
        notifier: Box<dyn StatusNotifier>,
    ) -> Self {
        Self {
            config,
            dump_executor,
            distributor,
            notifier,
        }
    }

    /// Run one backup and report its outcome
    pub fn run(&self) -> RunOutcome {
        let start_time = Instant::now();
        info!("Starting database backup");

        // Replaced by the resolved target name once resolution succeeds
        let mut database = self.config.database.name.clone().unwrap_or_default();

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| self.execute(&mut database))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!("Backup process failed: {}", reason);
                RunOutcome::Failure(reason)
            }
        };

        self.notify(&database, &outcome);

        match &outcome {
            RunOutcome::Success(artifact) => info!(
                "Backup completed in {:.2}s: {:?}",
                start_time.elapsed().as_secs_f64(),
                artifact.path
            ),
            RunOutcome::Failure(reason) => error!(
                "Backup failed after {:.2}s: {}",
                start_time.elapsed().as_secs_f64(),
                reason
            ),
        }

        outcome
    }

    /// Everything up to, but not including, the notification
    fn execute(&self, database: &mut String) -> RunOutcome {
        let target = match BackupTarget::from_config(&self.config.database) {
            Ok(target) => target,
            Err(e) => {
                error!("Backup process failed: {}", e);
                return RunOutcome::Failure(e.to_string());
            }
        };
        database.clone_from(&target.name);

        let output_dir = expand_tilde(&self.config.backup.local_path);
        info!(
            "Backing up {} database '{}' to {:?}",
            target.engine, target.name, output_dir
        );

        let Some(artifact) = self.dump_executor.dump(&target, &output_dir) else {
            return RunOutcome::Failure(format!(
                "{} backup of '{}' failed",
                target.engine, target.name
            ));
        };

        if let Err(e) = self.distributor.upload(&artifact) {
            error!("Failed to upload backup: {:#}", e);
        }

        RunOutcome::Success(artifact)
    }

    fn notify(&self, database: &str, outcome: &RunOutcome) {
        if let Err(e) = self
            .notifier
            .notify(database, outcome.artifact(), outcome.is_success())
        {
            warn!("Failed to send notification: {:#}", e);
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected panic".to_string()
    }
}
