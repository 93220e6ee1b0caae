//! Log output for a backup run
//!
//! A run writes to two places: stderr at INFO for whoever is watching, and a
//! daily rolling file at the configured level. Old files are pruned when the
//! file output is installed. `RUST_LOG` overrides both filters.

use crate::config::{expand_tilde, LoggingSettings};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Log files are named `<prefix>.log.<date>`
const LOG_FILE_PREFIX: &str = "db-backup-manager";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Where and how much a run logs
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_directory: PathBuf,
    /// File output only; stderr stays at INFO
    pub log_level: Level,
    /// Rotated files kept after pruning
    pub max_files: u32,
}

impl LoggingConfig {
    /// Resolve the `logging` block; the directory defaults to `<config dir>/logs`
    pub fn from_settings(settings: &LoggingSettings, config_dir: &Path) -> Self {
        Self {
            log_directory: settings
                .directory
                .as_deref()
                .map(expand_tilde)
                .unwrap_or_else(|| config_dir.join("logs")),
            log_level: parse_level(&settings.level),
            max_files: settings.max_files,
        }
    }
}

/// `warning` is accepted as an alias; anything unrecognised falls back to INFO
fn parse_level(level: &str) -> Level {
    let level = level.trim();
    if level.eq_ignore_ascii_case("warning") {
        return Level::WARN;
    }
    Level::from_str(level).unwrap_or(Level::INFO)
}

/// Install the stderr and rolling-file outputs.
///
/// Keep the returned guard alive until the run is over; dropping it flushes
/// whatever the background writer still holds.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard> {
    let log_dir = &config.log_directory;
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

    let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, format!("{}.log", LOG_FILE_PREFIX));
    let (writer, file_guard) = tracing_appender::non_blocking(appender);

    let layers: Vec<BoxedLayer> = vec![
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(level_filter(config.log_level))
            .boxed(),
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(level_filter(Level::INFO))
            .boxed(),
    ];

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("Failed to install logging subscriber")?;

    let pruned = prune_logs(log_dir, config.max_files)?;
    if !pruned.is_empty() {
        debug!("Pruned {} old log file(s) in {:?}", pruned.len(), log_dir);
    }

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

/// stderr-only output for commands that run without a configuration
pub fn init_console_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A subscriber may already be installed (tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(level).into())
            .parse_lossy(format!("db_backup_manager={}", level))
    })
}

/// Delete all but the `keep` newest log files, returning what was removed.
///
/// At least one file is always kept so the active one survives.
fn prune_logs(log_dir: &Path, keep: u32) -> Result<Vec<PathBuf>> {
    let mut logs: Vec<(Option<std::time::SystemTime>, PathBuf)> = fs::read_dir(log_dir)
        .with_context(|| format!("Failed to read log directory: {:?}", log_dir))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(LOG_FILE_PREFIX))
        .map(|entry| (entry.metadata().and_then(|m| m.modified()).ok(), entry.path()))
        .collect();

    logs.sort_by(|a, b| b.cmp(a));

    let mut removed = Vec::new();
    for (_, path) in logs.into_iter().skip(keep.max(1) as usize) {
        match fs::remove_file(&path) {
            Ok(()) => removed.push(path),
            Err(e) => warn!("Failed to remove old log file {:?}: {}", path, e),
        }
    }
    Ok(removed)
}

/// Flushes the file output when dropped
pub struct LogGuard {
    _file_guard: WorkerGuard,
}
