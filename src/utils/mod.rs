pub mod archive;
pub mod command;
pub mod cron;
pub mod download;
pub mod tool_provisioner;

// Trait-based abstractions for testability
pub mod executor;

// Re-export commonly used types and traits (used by test crate)
pub use download::{ArchiveDownloader, HttpDownloader};
pub use executor::{CommandExecutor, RealExecutor};
pub use tool_provisioner::{ProvisionError, ToolProvisioner};
