//! Artifact packaging of raw dump output

use db_backup_manager::utils::archive::{package, RawDump, RawOutput};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::Read;
use tempfile::TempDir;
use test_utils::{fake_mongodump_output, fixed_time, Engine};

fn raw(output: RawOutput, engine: Engine, database: &str) -> RawDump {
    RawDump {
        output,
        engine,
        database: database.to_string(),
        created_at: fixed_time(),
    }
}

#[test]
fn test_sql_file_becomes_gzip() {
    let dir = TempDir::new().unwrap();
    let sql = dir.path().join("mysql_orders_20240301_100000.sql");
    let dump = "-- MySQL dump\nINSERT INTO orders VALUES (1);\n".repeat(500);
    fs::write(&sql, &dump).unwrap();

    let artifact = package(&raw(RawOutput::SqlFile(sql.clone()), Engine::Relational, "orders")).unwrap();

    assert_eq!(artifact.path, dir.path().join("mysql_orders_20240301_100000.sql.gz"));
    assert_eq!(artifact.engine, Engine::Relational);
    assert_eq!(artifact.database, "orders");
    assert_eq!(artifact.created_at, fixed_time());
    assert!(artifact.size_bytes < dump.len() as u64);
    assert!(!sql.exists());

    let mut decoded = String::new();
    GzDecoder::new(File::open(&artifact.path).unwrap())
        .read_to_string(&mut decoded)
        .unwrap();
    assert_eq!(decoded, dump);
}

#[test]
fn test_dump_directory_becomes_tarball() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("mongodb_mydb_20240301_100000");
    fake_mongodump_output(&[format!("--out={}", out.display())]);

    let artifact = package(&raw(RawOutput::Directory(out.clone()), Engine::Document, "mydb")).unwrap();

    assert_eq!(artifact.file_name(), "mongodb_mydb_20240301_100000.tar.gz");
    assert!(!out.exists());

    let mut archive = tar::Archive::new(GzDecoder::new(File::open(&artifact.path).unwrap()));
    let mut tops: Vec<String> = archive
        .entries()
        .unwrap()
        .map(|e| {
            let path = e.unwrap().path().unwrap().into_owned();
            path.components()
                .next()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .unwrap_or_default()
        })
        .collect();
    tops.dedup();
    assert_eq!(tops, vec!["mongodb_mydb_20240301_100000"]);
}

#[test]
fn test_tarball_is_reproducible() {
    let dir = TempDir::new().unwrap();
    let mut archives = Vec::new();

    for sub in ["first", "second"] {
        let out = dir.path().join(sub).join("mongodb_mydb_20240301_100000");
        fake_mongodump_output(&[format!("--out={}", out.display())]);
        let artifact = package(&raw(RawOutput::Directory(out), Engine::Document, "mydb")).unwrap();
        archives.push(fs::read(&artifact.path).unwrap());
    }

    assert_eq!(archives[0], archives[1]);
}

#[test]
fn test_missing_sql_file_is_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.sql");
    assert!(package(&raw(RawOutput::SqlFile(missing), Engine::Relational, "orders")).is_err());
}
