//! Artifact packaging: turns raw dump output into one compressed file and
//! removes the uncompressed data.

use crate::target::{BackupArtifact, Engine};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tar::{Builder, HeaderMode};
use tracing::{debug, info};

/// Uncompressed output of a dump tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOutput {
    /// Single SQL file written by `mysqldump`
    SqlFile(PathBuf),
    /// Directory tree written by `mongodump`
    Directory(PathBuf),
}

/// A finished dump waiting to be packaged
#[derive(Debug, Clone)]
pub struct RawDump {
    pub output: RawOutput,
    pub engine: Engine,
    pub database: String,
    pub created_at: DateTime<Local>,
}

/// Compress the raw dump into its final artifact.
///
/// A SQL file becomes `<file>.gz`; a dump directory becomes `<dir>.tar.gz`
/// whose single top-level entry is the directory's base name. The
/// uncompressed input is deleted once the archive is written.
pub fn package(raw: &RawDump) -> Result<BackupArtifact> {
    let path = match &raw.output {
        RawOutput::SqlFile(file) => gzip_file(file)?,
        RawOutput::Directory(dir) => tar_gz_dir(dir)?,
    };

    let size_bytes = fs::metadata(&path)
        .with_context(|| format!("Failed to stat artifact {:?}", path))?
        .len();

    info!("Packaged backup artifact: {:?} ({} bytes)", path, size_bytes);

    Ok(BackupArtifact {
        path,
        size_bytes,
        created_at: raw.created_at,
        engine: raw.engine,
        database: raw.database.clone(),
    })
}

/// Append `suffix` to the full file name (`a.sql` -> `a.sql.gz`)
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Gzip `src` into `<src>.gz` and delete `src`
pub fn gzip_file(src: &Path) -> Result<PathBuf> {
    let dest = with_suffix(src, ".gz");
    debug!("Compressing {:?} -> {:?}", src, dest);

    let input = File::open(src).with_context(|| format!("Failed to open dump file {:?}", src))?;
    let output =
        File::create(&dest).with_context(|| format!("Failed to create archive {:?}", dest))?;

    let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::default());
    io::copy(&mut BufReader::new(input), &mut encoder)
        .with_context(|| format!("Failed to compress {:?}", src))?;
    encoder
        .finish()
        .and_then(|mut w| w.flush())
        .with_context(|| format!("Failed to finish archive {:?}", dest))?;

    fs::remove_file(src).with_context(|| format!("Failed to remove uncompressed dump {:?}", src))?;
    Ok(dest)
}

/// Archive `dir` into `<dir>.tar.gz` and delete the directory tree
pub fn tar_gz_dir(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        anyhow::bail!("Dump output is not a directory: {:?}", dir);
    }

    let top = dir
        .file_name()
        .map(PathBuf::from)
        .with_context(|| format!("Dump directory has no name: {:?}", dir))?;
    let dest = with_suffix(dir, ".tar.gz");
    debug!("Archiving {:?} -> {:?}", dir, dest);

    let output =
        File::create(&dest).with_context(|| format!("Failed to create archive {:?}", dest))?;
    let encoder = GzEncoder::new(BufWriter::new(output), Compression::default());
    let mut builder = Builder::new(encoder);
    builder.mode(HeaderMode::Deterministic);

    builder
        .append_dir(&top, dir)
        .with_context(|| format!("Failed to add {:?} to archive", dir))?;
    append_tree(&mut builder, dir, &top)?;

    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .and_then(|mut w| w.flush())
        .with_context(|| format!("Failed to finish archive {:?}", dest))?;

    fs::remove_dir_all(dir).with_context(|| format!("Failed to remove dump directory {:?}", dir))?;
    Ok(dest)
}

/// Add the contents of `dir` under `prefix`, in name order
fn append_tree<W: Write>(builder: &mut Builder<W>, dir: &Path, prefix: &Path) -> Result<()> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {:?}", dir))?
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let name = prefix.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            builder
                .append_dir(&name, &path)
                .with_context(|| format!("Failed to add {:?} to archive", path))?;
            append_tree(builder, &path, &name)?;
        } else {
            builder
                .append_path_with_name(&path, &name)
                .with_context(|| format!("Failed to add {:?} to archive", path))?;
        }
    }

    Ok(())
}
