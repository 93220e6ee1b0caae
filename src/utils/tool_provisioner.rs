//! Dump tool installation and management
//!
//! Locates an external dump executable on the search path or in the local
//! tool cache, and downloads the vendor distribution when neither exists.

use super::download::{ArchiveDownloader, HttpDownloader};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const MONGODB_TOOLS_BASE_URL: &str = "https://fastdl.mongodb.org/tools/db";
const MONGODB_TOOLS_VERSION: &str = "100.10.0";

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("No tool distribution available for this platform ({0})")]
    UnsupportedPlatform(String),

    #[error("Failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Failed to extract tool archive: {0}")]
    Extraction(String),

    #[error("Expected exactly one '{prefix}*' directory in the archive, found {found}")]
    UnexpectedArchiveLayout { prefix: String, found: usize },

    #[error("'{0}' is still missing after installing the tool distribution")]
    NotFoundAfterProvision(String),

    #[error("I/O error while provisioning tools: {0}")]
    Io(#[from] std::io::Error),
}

/// Archive formats used by the tool distributions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

/// Operating system and architecture with a published tool build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    WindowsX86_64,
    LinuxX86_64,
    MacOsX86_64,
    MacOsArm64,
}

impl Platform {
    /// Detect the platform this binary was built for
    pub fn current() -> Result<Self, ProvisionError> {
        if cfg!(target_os = "windows") && cfg!(target_arch = "x86_64") {
            Ok(Platform::WindowsX86_64)
        } else if cfg!(target_os = "linux") && cfg!(target_arch = "x86_64") {
            Ok(Platform::LinuxX86_64)
        } else if cfg!(target_os = "macos") && cfg!(target_arch = "x86_64") {
            Ok(Platform::MacOsX86_64)
        } else if cfg!(target_os = "macos") && cfg!(target_arch = "aarch64") {
            Ok(Platform::MacOsArm64)
        } else {
            Err(ProvisionError::UnsupportedPlatform(format!(
                "{}-{}",
                std::env::consts::OS,
                std::env::consts::ARCH
            )))
        }
    }

    pub fn archive_kind(&self) -> ArchiveKind {
        match self {
            Platform::LinuxX86_64 => ArchiveKind::TarGz,
            Platform::WindowsX86_64 | Platform::MacOsX86_64 | Platform::MacOsArm64 => ArchiveKind::Zip,
        }
    }

    fn is_windows(&self) -> bool {
        matches!(self, Platform::WindowsX86_64)
    }

    /// Executable file name for a tool on this platform
    pub fn binary_name(&self, tool: &str) -> String {
        if self.is_windows() {
            format!("{}.exe", tool)
        } else {
            tool.to_string()
        }
    }

    /// Versioned MongoDB Database Tools download URL
    pub fn mongodb_tools_url(&self) -> String {
        let (platform, ext) = match self {
            Platform::WindowsX86_64 => ("windows-x86_64", "zip"),
            Platform::LinuxX86_64 => ("ubuntu-x86_64", "tgz"),
            Platform::MacOsX86_64 => ("macos-x86_64", "zip"),
            Platform::MacOsArm64 => ("macos-arm64", "zip"),
        };
        format!(
            "{}/mongodb-database-tools-{}-{}.{}",
            MONGODB_TOOLS_BASE_URL, platform, MONGODB_TOOLS_VERSION, ext
        )
    }
}

/// Where a resolved tool came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOrigin {
    /// Found on the command search path
    PreInstalled,
    /// Served from the local tool cache
    Provisioned,
}

/// A located executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInstallation {
    pub path: PathBuf,
    pub origin: ToolOrigin,
}

/// Resolves dump executables, downloading the vendor distribution on demand
pub struct ToolProvisioner {
    config_dir: PathBuf,
    tools_dir: PathBuf,
    archive_prefix: String,
    platform: Option<Platform>,
    search_path: bool,
    downloader: Box<dyn ArchiveDownloader>,
}

impl ToolProvisioner {
    /// Provisioner for the MongoDB Database Tools, cached under
    /// `<config dir>/mongodb-tools`
    pub fn mongodb_tools(config_dir: &Path) -> Self {
        Self {
            config_dir: config_dir.to_path_buf(),
            tools_dir: config_dir.join("mongodb-tools"),
            archive_prefix: "mongodb-database-tools-".to_string(),
            platform: Platform::current().ok(),
            search_path: true,
            downloader: Box::new(HttpDownloader::new()),
        }
    }

    pub fn with_downloader(mut self, downloader: Box<dyn ArchiveDownloader>) -> Self {
        self.downloader = downloader;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Skip the search path and only consider the tool cache
    pub fn without_path_search(mut self) -> Self {
        self.search_path = false;
        self
    }

    pub fn tools_dir(&self) -> &Path {
        &self.tools_dir
    }

    fn platform(&self) -> Result<Platform, ProvisionError> {
        match self.platform {
            Some(p) => Ok(p),
            None => Platform::current(),
        }
    }

    fn binary_name(&self, tool: &str) -> String {
        match self.platform {
            Some(p) => p.binary_name(tool),
            None if cfg!(windows) => format!("{}.exe", tool),
            None => tool.to_string(),
        }
    }

    /// Path of the cached copy of `tool`
    pub fn cached_path(&self, tool: &str) -> PathBuf {
        self.tools_dir.join("bin").join(self.binary_name(tool))
    }

    /// Find `tool` without downloading anything
    pub fn locate(&self, tool: &str) -> Option<ToolInstallation> {
        let binary = self.binary_name(tool);

        if self.search_path {
            if let Ok(path) = which::which(&binary) {
                debug!("Found {} on PATH: {:?}", binary, path);
                return Some(ToolInstallation {
                    path,
                    origin: ToolOrigin::PreInstalled,
                });
            }
        }

        let cached = self.cached_path(tool);
        if cached.is_file() {
            debug!("Found cached {}: {:?}", binary, cached);
            return Some(ToolInstallation {
                path: cached,
                origin: ToolOrigin::Provisioned,
            });
        }

        None
    }

    /// Resolve `tool`, provisioning the distribution if it is not available
    pub fn resolve(&self, tool: &str) -> Result<ToolInstallation, ProvisionError> {
        if let Some(found) = self.locate(tool) {
            return Ok(found);
        }

        info!("{} not found, setting up tool distribution", tool);
        self.provision()?;

        let installed = self
            .locate(tool)
            .ok_or_else(|| ProvisionError::NotFoundAfterProvision(self.binary_name(tool)))?;
        make_executable(&installed.path)?;

        info!("{} installed at {:?}", tool, installed.path);
        Ok(installed)
    }

    /// Download and unpack the distribution into the tool cache
    fn provision(&self) -> Result<(), ProvisionError> {
        let platform = self.platform()?;
        let url = platform.mongodb_tools_url();
        fs::create_dir_all(&self.config_dir)?;

        // Removed when dropped, whatever happens below
        let archive = tempfile::Builder::new()
            .prefix(".download-")
            .tempfile_in(&self.config_dir)?;

        self.downloader
            .download(&url, archive.path())
            .map_err(|e| ProvisionError::Download {
                url: url.clone(),
                reason: format!("{:#}", e),
            })?;

        info!("Extracting tool archive");
        let result = self.extract(archive.path(), platform.archive_kind());

        if let Err(e) = archive.close() {
            warn!("Failed to remove downloaded archive: {}", e);
        }
        result
    }

    fn extract(&self, archive: &Path, kind: ArchiveKind) -> Result<(), ProvisionError> {
        let staging = tempfile::Builder::new()
            .prefix(".extract-")
            .tempdir_in(&self.config_dir)?;

        match kind {
            ArchiveKind::Zip => extract_zip(archive, staging.path())?,
            ArchiveKind::TarGz => extract_tar_gz(archive, staging.path())?,
        }

        let mut matches = Vec::new();
        for entry in fs::read_dir(staging.path())? {
            let entry = entry?;
            if entry.file_type()?.is_dir()
                && entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with(&self.archive_prefix)
            {
                matches.push(entry.path());
            }
        }

        if matches.len() != 1 {
            return Err(ProvisionError::UnexpectedArchiveLayout {
                prefix: self.archive_prefix.clone(),
                found: matches.len(),
            });
        }

        if self.tools_dir.exists() {
            debug!("Replacing previous installation at {:?}", self.tools_dir);
            fs::remove_dir_all(&self.tools_dir)?;
        }
        fs::rename(&matches[0], &self.tools_dir)?;

        Ok(())
    }
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<(), ProvisionError> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| ProvisionError::Extraction(format!("Failed to read ZIP archive: {}", e)))?;
    zip.extract(dest)
        .map_err(|e| ProvisionError::Extraction(format!("Failed to unpack ZIP archive: {}", e)))
}

fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<(), ProvisionError> {
    let file = File::open(archive)?;
    tar::Archive::new(GzDecoder::new(file))
        .unpack(dest)
        .map_err(|e| ProvisionError::Extraction(format!("Failed to unpack tar.gz archive: {}", e)))
}

fn make_executable(path: &Path) -> Result<(), ProvisionError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        if perms.mode() & 0o111 == 0 {
            perms.set_mode(0o755);
            fs::set_permissions(path, perms)?;
        }
    }

    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}
