//! Remote distribution of backup artifacts over FTP

use crate::config::FtpConfig;
use crate::target::BackupArtifact;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::net::ToSocketAddrs;
use std::time::Duration;
use suppaftp::types::FileType;
use suppaftp::FtpStream;
use tracing::{debug, info};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends a finished artifact somewhere off the machine
pub trait ArtifactDistributor: Send + Sync {
    fn upload(&self, artifact: &BackupArtifact) -> Result<()>;
}

/// Uploads artifacts to an FTP server
pub struct FtpDistributor {
    config: FtpConfig,
}

impl FtpDistributor {
    pub fn new(config: FtpConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn connect(&self) -> Result<FtpStream> {
        let host = self
            .config
            .host
            .as_deref()
            .context("FTP host is not configured")?;

        let addr = (host, self.config.port)
            .to_socket_addrs()
            .with_context(|| format!("Failed to resolve FTP host {}:{}", host, self.config.port))?
            .next()
            .with_context(|| format!("No address found for FTP host {}", host))?;

        debug!("Connecting to FTP server {}", addr);
        FtpStream::connect_timeout(addr, CONNECT_TIMEOUT)
            .with_context(|| format!("Failed to connect to FTP server {}:{}", host, self.config.port))
    }
}

impl ArtifactDistributor for FtpDistributor {
    fn upload(&self, artifact: &BackupArtifact) -> Result<()> {
        if !self.config.enabled {
            debug!("FTP upload disabled, skipping");
            return Ok(());
        }

        let mut ftp = self.connect()?;

        ftp.login(
            self.config.username.as_deref().unwrap_or("anonymous"),
            self.config.password.as_deref().unwrap_or(""),
        )
        .context("FTP login failed")?;

        // Fails when the directory already exists
        if let Err(e) = ftp.mkdir(&self.config.directory) {
            debug!("FTP mkdir {} ignored: {}", self.config.directory, e);
        }

        ftp.cwd(&self.config.directory)
            .with_context(|| format!("Failed to change to FTP directory {}", self.config.directory))?;
        ftp.transfer_type(FileType::Binary)
            .context("Failed to switch FTP transfer to binary mode")?;

        let file = File::open(&artifact.path)
            .with_context(|| format!("Failed to open artifact {:?}", artifact.path))?;
        let mut reader = BufReader::new(file);
        let remote_name = artifact.file_name();

        let sent = ftp
            .put_file(&remote_name, &mut reader)
            .with_context(|| format!("Failed to upload {} to FTP", remote_name))?;

        if let Err(e) = ftp.quit() {
            debug!("FTP quit failed: {}", e);
        }

        info!(
            "Backup file uploaded to FTP: {}/{} ({} bytes)",
            self.config.directory.trim_end_matches('/'),
            remote_name,
            sent
        );
        Ok(())
    }
}

/// Distributor doubles for tests
pub mod mock {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Records uploads and optionally fails them
    #[derive(Clone, Default)]
    pub struct MockDistributor {
        uploads: Arc<Mutex<Vec<PathBuf>>>,
        fail_with: Option<String>,
    }

    impl MockDistributor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing(message: &str) -> Self {
            Self {
                uploads: Arc::default(),
                fail_with: Some(message.to_string()),
            }
        }

        pub fn upload_count(&self) -> usize {
            self.uploads.lock().unwrap().len()
        }

        pub fn uploads(&self) -> Vec<PathBuf> {
            self.uploads.lock().unwrap().clone()
        }
    }

    impl ArtifactDistributor for MockDistributor {
        fn upload(&self, artifact: &BackupArtifact) -> Result<()> {
            self.uploads.lock().unwrap().push(artifact.path.clone());
            match self.fail_with {
                Some(ref message) => anyhow::bail!("{}", message),
                None => Ok(()),
            }
        }
    }
}
