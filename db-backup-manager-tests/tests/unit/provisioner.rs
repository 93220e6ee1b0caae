//! Tool provisioning against fake vendor archives

use db_backup_manager::utils::tool_provisioner::{
    Platform, ProvisionError, ToolOrigin, ToolProvisioner,
};
use db_backup_manager::utils::download::mock::MockDownloader;
use rstest::rstest;
use std::fs;
use tempfile::TempDir;
use test_utils::{
    corrupt_downloader, tools_downloader, tools_downloader_with, write_tools_zip, LINUX_TOOLS_DIR,
};

fn provisioner(dir: &TempDir, platform: Platform, downloader: &MockDownloader) -> ToolProvisioner {
    ToolProvisioner::mongodb_tools(dir.path())
        .with_platform(platform)
        .without_path_search()
        .with_downloader(Box::new(downloader.clone()))
}

#[rstest]
#[case(Platform::WindowsX86_64, "mongodb-database-tools-windows-x86_64-100.10.0.zip")]
#[case(Platform::LinuxX86_64, "mongodb-database-tools-ubuntu-x86_64-100.10.0.tgz")]
#[case(Platform::MacOsX86_64, "mongodb-database-tools-macos-x86_64-100.10.0.zip")]
#[case(Platform::MacOsArm64, "mongodb-database-tools-macos-arm64-100.10.0.zip")]
fn test_distribution_urls(#[case] platform: Platform, #[case] file: &str) {
    assert_eq!(
        platform.mongodb_tools_url(),
        format!("https://fastdl.mongodb.org/tools/db/{}", file)
    );
}

#[test]
fn test_second_resolve_is_memoized() {
    let dir = TempDir::new().unwrap();
    let downloader = tools_downloader();
    let provisioner = provisioner(&dir, Platform::LinuxX86_64, &downloader);

    let first = provisioner.resolve("mongodump").unwrap();
    let second = provisioner.resolve("mongodump").unwrap();

    assert_eq!(downloader.request_count(), 1);
    assert_eq!(first, second);
    assert_eq!(first.origin, ToolOrigin::Provisioned);
    assert_eq!(first.path, dir.path().join("mongodb-tools/bin/mongodump"));
}

#[test]
fn test_fresh_provisioner_reuses_cache() {
    let dir = TempDir::new().unwrap();
    let downloader = tools_downloader();
    provisioner(&dir, Platform::LinuxX86_64, &downloader)
        .resolve("mongodump")
        .unwrap();

    // A later run starts with a new provisioner but the same config dir
    let later = MockDownloader::failing();
    let found = provisioner(&dir, Platform::LinuxX86_64, &later)
        .resolve("mongodump")
        .unwrap();

    assert_eq!(later.request_count(), 0);
    assert_eq!(found.origin, ToolOrigin::Provisioned);
}

#[test]
fn test_only_tools_dir_left_behind() {
    let dir = TempDir::new().unwrap();
    let downloader = tools_downloader();
    provisioner(&dir, Platform::LinuxX86_64, &downloader)
        .resolve("mongodump")
        .unwrap();

    let entries: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(entries, vec!["mongodb-tools"]);
    assert!(!dir.path().join(LINUX_TOOLS_DIR).exists());
}

#[test]
fn test_windows_zip_distribution() {
    let dir = TempDir::new().unwrap();
    let downloader = MockDownloader::new(|dest| {
        write_tools_zip(
            dest,
            "mongodb-database-tools-windows-x86_64-100.10.0",
            "mongodump.exe",
        )
    });
    let provisioner = provisioner(&dir, Platform::WindowsX86_64, &downloader);

    let tool = provisioner.resolve("mongodump").unwrap();

    assert_eq!(tool.path, dir.path().join("mongodb-tools/bin/mongodump.exe"));
    assert_eq!(
        downloader.requests(),
        vec![Platform::WindowsX86_64.mongodb_tools_url()]
    );
}

#[rstest]
#[case::none(&[])]
#[case::two(&["mongodb-database-tools-a", "mongodb-database-tools-b"])]
fn test_unexpected_layout(#[case] tops: &'static [&'static str]) {
    let dir = TempDir::new().unwrap();
    let downloader = tools_downloader_with(tops);

    let err = provisioner(&dir, Platform::LinuxX86_64, &downloader)
        .resolve("mongodump")
        .unwrap_err();

    match err {
        ProvisionError::UnexpectedArchiveLayout { found, .. } => assert_eq!(found, tops.len()),
        other => panic!("Expected UnexpectedArchiveLayout, got {:?}", other),
    }
    assert!(!dir.path().join("mongodb-tools").exists());
}

#[test]
fn test_corrupt_download_is_extraction_error() {
    let dir = TempDir::new().unwrap();
    let downloader = corrupt_downloader();

    let err = provisioner(&dir, Platform::LinuxX86_64, &downloader)
        .resolve("mongodump")
        .unwrap_err();

    assert!(matches!(err, ProvisionError::Extraction(_)), "{:?}", err);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_download_failure_keeps_url() {
    let dir = TempDir::new().unwrap();
    let downloader = MockDownloader::failing();

    let err = provisioner(&dir, Platform::LinuxX86_64, &downloader)
        .resolve("mongodump")
        .unwrap_err();

    match err {
        ProvisionError::Download { url, reason } => {
            assert_eq!(url, Platform::LinuxX86_64.mongodb_tools_url());
            assert!(reason.contains("503"));
        }
        other => panic!("Expected Download error, got {:?}", other),
    }
}
