//! Streamed HTTP downloads with progress reporting

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const CHUNK_SIZE: usize = 64 * 1024;

/// Fetches a remote archive into a local file
pub trait ArchiveDownloader: Send + Sync {
    /// Download `url` into `dest`, returning the number of bytes written
    fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// Blocking HTTP downloader that streams the body to disk in chunks
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    timeout: Duration,
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
        }
    }
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drawn on stderr; indicatif hides it when stderr is not a terminal
    fn progress_bar(&self, total: Option<u64>) -> ProgressBar {
        match total {
            Some(len) => {
                let pb = ProgressBar::new(len);
                if let Ok(style) = ProgressStyle::with_template(
                    "  Downloading [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                ) {
                    pb.set_style(style.progress_chars("=> "));
                }
                pb
            }
            // Content length unknown: count bytes without a bar
            None => {
                let pb = ProgressBar::new_spinner();
                if let Ok(style) =
                    ProgressStyle::with_template("  {spinner:.cyan} Downloading {bytes} ({bytes_per_sec})")
                {
                    pb.set_style(style);
                }
                pb.enable_steady_tick(Duration::from_millis(120));
                pb
            }
        }
    }
}

impl ArchiveDownloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        info!("Downloading {}", url);

        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("db-backup-manager/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let mut response = client
            .get(url)
            .send()
            .with_context(|| format!("Failed to download {}", url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Failed to download {}: HTTP {}", url, status);
        }

        let total = response.content_length();
        debug!("Content length: {:?}", total);

        let file = File::create(dest)
            .with_context(|| format!("Failed to create download file {:?}", dest))?;
        let mut writer = BufWriter::new(file);
        let pb = self.progress_bar(total);

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut written: u64 = 0;
        loop {
            let n = response
                .read(&mut buf)
                .context("Failed to read response body")?;
            if n == 0 {
                break;
            }
            writer
                .write_all(&buf[..n])
                .context("Failed to write download file")?;
            written += n as u64;
            pb.set_position(written);
        }
        writer.flush().context("Failed to flush download file")?;
        pb.finish_and_clear();

        if let Some(expected) = total {
            if expected != written {
                anyhow::bail!(
                    "Download of {} was truncated: expected {} bytes, got {}",
                    url,
                    expected,
                    written
                );
            }
        }

        info!("Downloaded {} bytes", written);
        Ok(written)
    }
}

/// Downloader doubles for tests
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Payload = Arc<dyn Fn(&Path) -> Result<()> + Send + Sync>;

    /// Records requested URLs and writes a canned payload instead of
    /// touching the network
    #[derive(Clone)]
    pub struct MockDownloader {
        requests: Arc<Mutex<Vec<String>>>,
        payload: Payload,
    }

    impl MockDownloader {
        /// Write `payload(dest)` for every download
        pub fn new<F>(payload: F) -> Self
        where
            F: Fn(&Path) -> Result<()> + Send + Sync + 'static,
        {
            Self {
                requests: Arc::new(Mutex::new(Vec::new())),
                payload: Arc::new(payload),
            }
        }

        /// Every download fails as if the server returned an error
        pub fn failing() -> Self {
            Self::new(|_| anyhow::bail!("HTTP 503 Service Unavailable"))
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl ArchiveDownloader for MockDownloader {
        fn download(&self, url: &str, dest: &Path) -> Result<u64> {
            self.requests.lock().unwrap().push(url.to_string());
            (self.payload)(dest)?;
            Ok(std::fs::metadata(dest)?.len())
        }
    }
}
