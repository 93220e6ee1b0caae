//! Test fixtures and sample data
//!
//! Fake MongoDB Database Tools archives, a fake `mongodump` side effect and
//! fixed clocks for deterministic artifact names.

use chrono::{DateTime, Local, TimeZone};
use db_backup_manager::utils::download::mock::MockDownloader;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Top-level directory of a realistic Linux tools archive
pub const LINUX_TOOLS_DIR: &str = "mongodb-database-tools-ubuntu-x86_64-100.10.0";

/// Script body used as the fake `mongodump` binary
const FAKE_BINARY: &[u8] = b"#!/bin/sh\nexit 0\n";

/// 2024-03-01 10:00:00 local time
pub fn fixed_time() -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2024, 3, 1, 10, 0, 0)
        .single()
        .expect("unambiguous fixture time")
}

/// Write a `.tgz` with `<top>/bin/mongodump` for each top-level directory
pub fn write_tools_tgz(dest: &Path, top_dirs: &[&str]) -> anyhow::Result<()> {
    let encoder = GzEncoder::new(File::create(dest)?, Compression::fast());
    let mut builder = tar::Builder::new(encoder);

    for top in top_dirs {
        let mut header = tar::Header::new_gnu();
        header.set_size(FAKE_BINARY.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, format!("{}/bin/mongodump", top), FAKE_BINARY)?;
    }

    builder.into_inner()?.finish()?.flush()?;
    Ok(())
}

/// Write a `.zip` with `<top>/bin/<binary>`
pub fn write_tools_zip(dest: &Path, top: &str, binary: &str) -> anyhow::Result<()> {
    let mut zip = zip::ZipWriter::new(File::create(dest)?);
    let options = zip::write::SimpleFileOptions::default();
    zip.start_file(format!("{}/bin/{}", top, binary), options)?;
    zip.write_all(FAKE_BINARY)?;
    zip.finish()?;
    Ok(())
}

/// Downloader serving a valid Linux tools archive
pub fn tools_downloader() -> MockDownloader {
    MockDownloader::new(|dest| write_tools_tgz(dest, &[LINUX_TOOLS_DIR]))
}

/// Downloader serving an archive with the given top-level directories
pub fn tools_downloader_with(top_dirs: &'static [&'static str]) -> MockDownloader {
    MockDownloader::new(move |dest| write_tools_tgz(dest, top_dirs))
}

/// Downloader serving bytes that are not an archive
pub fn corrupt_downloader() -> MockDownloader {
    MockDownloader::new(|dest| Ok(fs::write(dest, b"<html>not found</html>")?))
}

/// Directory a `--out=<dir>` argument points to
fn out_dir_from_args(args: &[String]) -> Option<PathBuf> {
    args.iter()
        .find_map(|a| a.strip_prefix("--out="))
        .map(PathBuf::from)
}

/// What a real `mongodump` leaves behind: `<out>/<db>/<collection>.bson`
pub fn fake_mongodump_output(args: &[String]) {
    let Some(out) = out_dir_from_args(args) else {
        return;
    };
    let db_dir = out.join("mydb");
    fs::create_dir_all(&db_dir).expect("Failed to create fake dump dir");
    fs::write(db_dir.join("users.bson"), vec![0u8; 2048]).expect("Failed to write fake dump");
    fs::write(db_dir.join("users.metadata.json"), b"{\"indexes\":[]}")
        .expect("Failed to write fake dump");
}

/// Minimal valid config JSON template
pub fn minimal_config_json() -> &'static str {
    r#"{
  "database": {
    "type": "mysql",
    "name": "orders",
    "username": "root",
    "password": "secret"
  },
  "backup": {
    "local_path": "{backup_path}"
  }
}"#
}

/// Config JSON as the interactive setup of older releases wrote it
pub fn legacy_config_json() -> &'static str {
    r#"{
  "database": {
    "type": "mongodb",
    "name": "mydb",
    "connection_string": "",
    "host": "localhost",
    "port": "27017",
    "username": "",
    "password": ""
  },
  "backup": { "local_path": "{backup_path}", "retention_days": 7 },
  "email": {
    "smtp_server": "",
    "smtp_port": 587,
    "username": "",
    "password": "",
    "recipients": []
  },
  "ftp": {
    "enabled": false,
    "host": "",
    "port": 21,
    "username": "",
    "password": "",
    "directory": "/backups"
  },
  "schedule": { "frequency": "daily", "times": ["00:00"] }
}"#
}

/// Fill `{backup_path}` in a template
pub fn render(template: &str, backup_path: &Path) -> String {
    template.replace(
        "{backup_path}",
        &backup_path.display().to_string().replace('\\', "\\\\"),
    )
}
