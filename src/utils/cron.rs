//! Scheduling hints for the OS scheduler
//!
//! Runs are triggered externally; these helpers only render the cron line or
//! Windows task command that `--setup` prints.

use crate::config::ScheduleConfig;
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Get the path to the db-backup-manager binary
pub fn get_binary_path() -> Result<PathBuf> {
    env::current_exe().context("Failed to get current executable path")
}

/// Parse `HH:MM` into hour and minute
fn parse_time(time: &str) -> Option<(u32, u32)> {
    let (hour, minute) = time.trim().split_once(':')?;
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    (hour < 24 && minute < 60).then_some((hour, minute))
}

/// Day-of-month and day-of-week fields for a frequency
fn day_fields(frequency: &str) -> &'static str {
    match frequency.to_lowercase().as_str() {
        "weekly" => "* * 0",
        "monthly" => "1 * *",
        _ => "* * *",
    }
}

/// One crontab line per configured time; invalid times are skipped
pub fn cron_entries(schedule: &ScheduleConfig, binary: &Path, config_path: &Path) -> Vec<String> {
    schedule
        .times
        .iter()
        .filter_map(|time| {
            let parsed = parse_time(time);
            if parsed.is_none() {
                warn!("Ignoring invalid schedule time '{}'", time);
            }
            parsed
        })
        .map(|(hour, minute)| {
            format!(
                "{} {} {} {} --config {} --run",
                minute,
                hour,
                day_fields(&schedule.frequency),
                binary.display(),
                config_path.display()
            )
        })
        .collect()
}

/// `schtasks` command lines for Windows, one per configured time
pub fn windows_task_commands(
    schedule: &ScheduleConfig,
    binary: &Path,
    config_path: &Path,
) -> Vec<String> {
    let frequency = match schedule.frequency.to_lowercase().as_str() {
        "weekly" => "WEEKLY",
        "monthly" => "MONTHLY",
        _ => "DAILY",
    };

    schedule
        .times
        .iter()
        .filter_map(|time| parse_time(time))
        .enumerate()
        .map(|(i, (hour, minute))| {
            format!(
                "schtasks /Create /TN \"DatabaseBackup{}\" /TR \"\\\"{}\\\" --config \\\"{}\\\" --run\" /SC {} /ST {:02}:{:02}",
                i + 1,
                binary.display(),
                config_path.display(),
                frequency,
                hour,
                minute
            )
        })
        .collect()
}
