//! Dump executor - runs the engine-specific dump tool and packages its output

use crate::target::{BackupArtifact, BackupTarget, Connection, ConnectionParams, Engine};
use crate::utils::archive::{self, RawDump, RawOutput};
use crate::utils::executor::CommandExecutor;
use crate::utils::tool_provisioner::{ProvisionError, ToolProvisioner};
use chrono::{DateTime, Local};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};

/// Dump command for MySQL, expected on the search path
pub const MYSQLDUMP: &str = "mysqldump";

/// Dump command for MongoDB, provisioned on demand
pub const MONGODUMP: &str = "mongodump";

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("Dump tool unavailable: {0}")]
    ToolMissing(#[from] ProvisionError),

    #[error("{program} failed: {reason}")]
    ProcessFailed { program: String, reason: String },

    #[error("I/O error during dump: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to package dump: {0}")]
    Packaging(String),
}

type Clock = Box<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// Produces one backup artifact for a target
pub struct DumpExecutor {
    executor: Box<dyn CommandExecutor>,
    provisioner: ToolProvisioner,
    timeout: Option<Duration>,
    clock: Clock,
}

impl DumpExecutor {
    pub fn new(executor: Box<dyn CommandExecutor>, provisioner: ToolProvisioner) -> Self {
        Self {
            executor,
            provisioner,
            timeout: None,
            clock: Box::new(Local::now),
        }
    }

    /// Abort a dump command that runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the time source used for artifact names
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Local> + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    /// Dump and package `target` into `output_dir`.
    ///
    /// Every failure is logged and reported as `None`; the caller treats it
    /// as a failed run rather than an error.
    pub fn dump(&self, target: &BackupTarget, output_dir: &Path) -> Option<BackupArtifact> {
        match self.try_dump(target, output_dir) {
            Ok(artifact) => {
                info!(
                    "{} backup completed: {:?}",
                    target.engine, artifact.path
                );
                Some(artifact)
            }
            Err(e) => {
                error!("{} backup of '{}' failed: {}", target.engine, target.name, e);
                None
            }
        }
    }

    /// Same as [`dump`](Self::dump) but keeps the failure kind
    pub fn try_dump(
        &self,
        target: &BackupTarget,
        output_dir: &Path,
    ) -> Result<BackupArtifact, DumpError> {
        fs::create_dir_all(output_dir)?;

        let created_at = (self.clock)();
        let stem = target.dump_stem(&created_at.naive_local());

        let output = match target.engine {
            Engine::Relational => self.dump_mysql(target, &output_dir.join(format!("{}.sql", stem)))?,
            Engine::Document => self.dump_mongodb(target, &output_dir.join(&stem))?,
        };

        let raw = RawDump {
            output,
            engine: target.engine,
            database: target.name.clone(),
            created_at,
        };
        archive::package(&raw).map_err(|e| DumpError::Packaging(format!("{:#}", e)))
    }

    fn dump_mysql(&self, target: &BackupTarget, sql_file: &Path) -> Result<RawOutput, DumpError> {
        let Connection::Params(params) = &target.connection else {
            return Err(DumpError::ProcessFailed {
                program: MYSQLDUMP.to_string(),
                reason: "a connection URI cannot be used for MySQL".to_string(),
            });
        };
        let args = mysqldump_args(params, &target.name);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        info!("Running {} for database '{}'", MYSQLDUMP, target.name);

        if let Err(e) = self
            .executor
            .run_command_to_file(MYSQLDUMP, &args, sql_file, self.timeout)
        {
            remove_partial(sql_file);
            return Err(DumpError::ProcessFailed {
                program: MYSQLDUMP.to_string(),
                reason: format!("{:#}", e),
            });
        }

        Ok(RawOutput::SqlFile(sql_file.to_path_buf()))
    }

    fn dump_mongodb(&self, target: &BackupTarget, out_dir: &Path) -> Result<RawOutput, DumpError> {
        let tool = self.provisioner.resolve(MONGODUMP)?;
        let program = tool.path.display().to_string();

        let args = mongodump_args(&target.connection, &target.name, out_dir);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        info!("Running {} for database '{}'", program, target.name);

        if let Err(e) = self.executor.run_command(&program, &args, None, self.timeout) {
            remove_partial(out_dir);
            return Err(DumpError::ProcessFailed {
                program: MONGODUMP.to_string(),
                reason: format!("{:#}", e),
            });
        }

        Ok(RawOutput::Directory(out_dir.to_path_buf()))
    }
}

/// `mysqldump -h<host> [-P<port>] -u<user> -p<password> <db>`
pub fn mysqldump_args(params: &ConnectionParams, database: &str) -> Vec<String> {
    let mut args = vec![format!("-h{}", params.host)];
    if let Some(port) = params.port {
        args.push(format!("-P{}", port));
    }
    if let Some(ref user) = params.username {
        args.push(format!("-u{}", user));
    }
    if let Some(ref password) = params.password {
        args.push(format!("-p{}", password));
    }
    args.push(database.to_string());
    args
}

/// `mongodump --uri=<uri> --out=<dir>` or the individual-parameter form
pub fn mongodump_args(connection: &Connection, database: &str, out_dir: &Path) -> Vec<String> {
    let mut args = match connection {
        Connection::Uri(uri) => vec![format!("--uri={}", uri)],
        Connection::Params(params) => {
            let mut args = vec![format!("--host={}", params.host)];
            if let Some(port) = params.port {
                args.push(format!("--port={}", port));
            }
            args.push(format!("--db={}", database));
            if let Some(ref user) = params.username {
                args.push(format!("--username={}", user));
            }
            if let Some(ref password) = params.password {
                args.push(format!("--password={}", password));
            }
            args
        }
    };
    args.push(format!("--out={}", out_dir.display()));
    args
}

fn remove_partial(path: &Path) {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else if path.exists() {
        fs::remove_file(path)
    } else {
        return;
    };

    if let Err(e) = result {
        warn!("Failed to remove partial dump output {:?}: {}", path, e);
    }
}
