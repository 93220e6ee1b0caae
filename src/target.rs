//! Domain types for a single backup run: what is backed up, what a run
//! produces and how it ended.

use crate::config::DatabaseConfig;
use chrono::{DateTime, Local, NaiveDateTime};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Timestamp format embedded in dump file names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("Unsupported database type: {0}")]
    UnsupportedEngine(String),

    #[error("Missing database setting: {0}")]
    MissingField(&'static str),
}

/// Supported database engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    /// MySQL, dumped with `mysqldump`
    Relational,
    /// MongoDB, dumped with `mongodump`
    Document,
}

impl Engine {
    /// Identifier used in configuration and artifact names
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Relational => "mysql",
            Engine::Document => "mongodb",
        }
    }

    pub fn parse(value: &str) -> Result<Self, TargetError> {
        match value.trim().to_lowercase().as_str() {
            "mysql" => Ok(Engine::Relational),
            "mongodb" => Ok(Engine::Document),
            other => Err(TargetError::UnsupportedEngine(other.to_string())),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Individual connection parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// How the dump tool reaches the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    Params(ConnectionParams),
    Uri(String),
}

/// One database to back up, fixed for the duration of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupTarget {
    pub engine: Engine,
    pub name: String,
    pub connection: Connection,
}

impl BackupTarget {
    /// Build the target from the `database` configuration block.
    ///
    /// MySQL always uses the individual parameters. MongoDB uses the
    /// connection string when one is present and warns if individual
    /// credentials were configured as well, since those are then ignored.
    pub fn from_config(db: &DatabaseConfig) -> Result<Self, TargetError> {
        let engine_name = db
            .db_type
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| TargetError::UnsupportedEngine("<unset>".to_string()))?;
        let engine = Engine::parse(engine_name)?;

        let uri = non_empty(&db.connection_string);
        let name = match (non_empty(&db.name), engine, uri.as_deref()) {
            (Some(name), _, _) => name,
            (None, Engine::Document, Some(uri)) => {
                database_from_uri(uri).ok_or(TargetError::MissingField("database.name"))?
            }
            _ => return Err(TargetError::MissingField("database.name")),
        };

        let params = || ConnectionParams {
            host: non_empty(&db.host).unwrap_or_else(|| "localhost".to_string()),
            port: db.port,
            username: non_empty(&db.username),
            password: db.password.clone(),
        };

        let connection = match (engine, uri) {
            (Engine::Document, Some(uri)) => {
                if db.port.is_some() || non_empty(&db.username).is_some() || db.password.is_some() {
                    warn!(
                        "Both a connection string and individual parameters are configured for '{}'; using the connection string",
                        name
                    );
                }
                Connection::Uri(uri)
            }
            _ => Connection::Params(params()),
        };

        Ok(Self {
            engine,
            name,
            connection,
        })
    }

    /// Base name of the raw dump, e.g. `mysql_orders_20240301_100000`
    pub fn dump_stem(&self, timestamp: &NaiveDateTime) -> String {
        format!(
            "{}_{}_{}",
            self.engine.as_str(),
            self.name,
            timestamp.format(TIMESTAMP_FORMAT)
        )
    }
}

/// Database name from the path component of a MongoDB URI
pub fn database_from_uri(uri: &str) -> Option<String> {
    let rest = uri.split_once("://").map(|(_, rest)| rest)?;
    let path = rest.split_once('/').map(|(_, path)| path)?;
    let name = path.split(['?', '/']).next().unwrap_or_default();
    (!name.is_empty()).then(|| name.to_string())
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// The compressed file produced by a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct BackupArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub created_at: DateTime<Local>,
    pub engine: Engine,
    pub database: String,
}

impl BackupArtifact {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Size in MiB, as shown in reports
    pub fn size_mib(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Result of one orchestration pass
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Success(BackupArtifact),
    Failure(String),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success(_))
    }

    pub fn artifact(&self) -> Option<&BackupArtifact> {
        match self {
            RunOutcome::Success(artifact) => Some(artifact),
            RunOutcome::Failure(_) => None,
        }
    }
}
