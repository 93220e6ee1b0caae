use anyhow::{Context, Result};
use clap::{ArgGroup, CommandFactory, Parser};
use db_backup_manager::config::{self, ConfigError};
use db_backup_manager::managers::logging::{self, LoggingConfig};
use db_backup_manager::utils::cron;
use db_backup_manager::{BackupManager, RunOutcome};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Exit status for a run stopped with Ctrl-C
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "db-backup-manager")]
#[command(about = "Backs up a MySQL or MongoDB database, with optional FTP upload and email reports", long_about = None)]
#[command(version)]
#[command(group(ArgGroup::new("mode").args(["setup", "run"])))]
struct Cli {
    /// Write a default configuration file and print scheduling hints
    #[arg(long)]
    setup: bool,

    /// Run one backup with the saved configuration
    #[arg(long)]
    run: bool,

    /// Path to configuration file [default: <install dir>/.config/backup_config.json]
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(config::default_config_path);

    if cli.setup {
        logging::init_console_logging();
        return match handle_setup(&config_path) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Setup failed: {:#}", e);
                ExitCode::FAILURE
            }
        };
    }

    if cli.run {
        return handle_run(config_path).await;
    }

    if let Err(e) = Cli::command().print_help() {
        eprintln!("Failed to print help: {}", e);
    }
    println!();
    ExitCode::SUCCESS
}

fn handle_setup(config_path: &Path) -> Result<()> {
    let (config, created) = config::init_config(config_path, &config::install_dir())
        .with_context(|| format!("Failed to set up configuration {:?}", config_path))?;

    if created {
        println!("✓ Default configuration written to {}", config_path.display());
        println!("  Edit the database, email and ftp sections before the first run.");
    } else {
        println!("Configuration already exists: {}", config_path.display());
    }

    let binary = cron::get_binary_path()?;
    println!();
    println!("To schedule backups with cron, add:");
    for entry in cron::cron_entries(&config.schedule, &binary, config_path) {
        println!("  {}", entry);
    }
    println!();
    println!("On Windows, create scheduled tasks with:");
    for command in cron::windows_task_commands(&config.schedule, &binary, config_path) {
        println!("  {}", command);
    }

    Ok(())
}

async fn handle_run(config_path: PathBuf) -> ExitCode {
    let config = match config::load_config(&config_path) {
        Ok(config) => config,
        Err(ConfigError::NotFound(path)) => {
            eprintln!("Configuration not found: {}", path.display());
            eprintln!("Run with --setup first to create it.");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let config_dir = config::config_dir_for(&config_path);

    // Must stay alive until the run finishes so buffered logs reach the file
    let log_guard = match logging::init_logging(&LoggingConfig::from_settings(&config.logging, &config_dir)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Using configuration {:?}", config_path);
    let manager = BackupManager::new(config, &config_dir);
    let run = tokio::task::spawn_blocking(move || manager.run());

    tokio::select! {
        result = run => match result {
            Ok(RunOutcome::Success(artifact)) => {
                println!("✓ Backup completed: {}", artifact.path.display());
                ExitCode::SUCCESS
            }
            Ok(RunOutcome::Failure(reason)) => {
                println!("✗ Backup failed: {}", reason);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Backup worker stopped unexpectedly: {}", e);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("Backup interrupted by user");
            // The runtime would wait for the blocking worker on shutdown
            drop(log_guard);
            std::process::exit(i32::from(EXIT_INTERRUPTED));
        }
    }
}
