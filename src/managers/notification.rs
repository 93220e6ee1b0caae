//! Email notification manager
//!
//! Sends a plain-text status report for each backup run over SMTP with
//! STARTTLS.

use crate::config::EmailConfig;
use crate::target::BackupArtifact;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::time::Duration;
use tracing::{debug, info};

const SMTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Receives the final status of a run
pub trait StatusNotifier: Send + Sync {
    /// `database` is the name of the database the run targeted
    fn notify(&self, database: &str, artifact: Option<&BackupArtifact>, success: bool) -> Result<()>;
}

/// Rendered notification content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub subject: String,
    pub body: String,
}

/// Compose the report for one run
pub fn build_report(
    database: &str,
    artifact: Option<&BackupArtifact>,
    success: bool,
    now: DateTime<Local>,
) -> StatusReport {
    let status = if success { "Success" } else { "Failure" };

    let mut body = format!(
        "Backup Status: {}\nDatabase: {}\nTimestamp: {}\n",
        status,
        database,
        now.format("%Y-%m-%d %H:%M:%S")
    );

    if success {
        if let Some(artifact) = artifact {
            body.push_str(&format!(
                "\nBackup File: {}\nFile Size: {:.2} MB\n",
                artifact.path.display(),
                artifact.size_mib()
            ));
        }
    }

    StatusReport {
        subject: format!("Database Backup {}", status),
        body,
    }
}

/// SMTP notification manager
pub struct NotificationManager {
    config: EmailConfig,
}

impl NotificationManager {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Check if there is enough configuration to send mail
    pub fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }

    fn build_message(&self, report: &StatusReport) -> Result<Message> {
        let sender = self
            .config
            .username
            .as_deref()
            .context("Email username is not configured")?;
        let from: Mailbox = sender
            .parse()
            .with_context(|| format!("Invalid sender address: {}", sender))?;

        let mut builder = Message::builder()
            .from(from)
            .subject(report.subject.clone())
            .header(ContentType::TEXT_PLAIN);

        for recipient in &self.config.recipients {
            let to: Mailbox = recipient
                .trim()
                .parse()
                .with_context(|| format!("Invalid recipient address: {}", recipient))?;
            builder = builder.to(to);
        }

        builder
            .body(report.body.clone())
            .context("Failed to build notification email")
    }

    fn send_message(&self, message: &Message) -> Result<()> {
        let server = self
            .config
            .smtp_server
            .as_deref()
            .context("SMTP server is not configured")?;

        let mut transport = SmtpTransport::starttls_relay(server)
            .with_context(|| format!("Failed to set up SMTP connection to {}", server))?
            .port(self.config.smtp_port)
            .timeout(Some(SMTP_TIMEOUT));

        if let (Some(user), Some(password)) = (&self.config.username, &self.config.password) {
            transport = transport.credentials(Credentials::new(user.clone(), password.clone()));
        }

        transport
            .build()
            .send(message)
            .with_context(|| format!("Failed to send email via {}:{}", server, self.config.smtp_port))?;
        Ok(())
    }
}

impl StatusNotifier for NotificationManager {
    fn notify(&self, database: &str, artifact: Option<&BackupArtifact>, success: bool) -> Result<()> {
        if !self.is_enabled() {
            debug!("Email notifications not configured, skipping");
            return Ok(());
        }

        let report = build_report(database, artifact, success, Local::now());
        let message = self.build_message(&report)?;
        self.send_message(&message)?;

        info!(
            "Email notification sent to {} recipient(s)",
            self.config.recipients.len()
        );
        Ok(())
    }
}

/// Notifier doubles for tests
pub mod mock {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// One recorded `notify` call
    #[derive(Debug, Clone, PartialEq)]
    pub struct NotifyCall {
        pub database: String,
        pub success: bool,
        pub artifact: Option<PathBuf>,
        pub size_bytes: Option<u64>,
    }

    /// Records every notification and optionally fails
    #[derive(Clone, Default)]
    pub struct MockNotifier {
        calls: Arc<Mutex<Vec<NotifyCall>>>,
        fail_with: Option<String>,
    }

    impl MockNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing(message: &str) -> Self {
            Self {
                calls: Arc::default(),
                fail_with: Some(message.to_string()),
            }
        }

        pub fn calls(&self) -> Vec<NotifyCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl StatusNotifier for MockNotifier {
        fn notify(&self, database: &str, artifact: Option<&BackupArtifact>, success: bool) -> Result<()> {
            self.calls.lock().unwrap().push(NotifyCall {
                database: database.to_string(),
                success,
                artifact: artifact.map(|a| a.path.clone()),
                size_bytes: artifact.map(|a| a.size_bytes),
            });
            match self.fail_with {
                Some(ref message) => anyhow::bail!("{}", message),
                None => Ok(()),
            }
        }
    }
}
