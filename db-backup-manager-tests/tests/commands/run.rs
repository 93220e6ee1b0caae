//! Tests for a backup run (`--run`)
//!
//! Each run resolves the target, dumps, packages, uploads and notifies once.

use db_backup_manager::managers::dump::{MONGODUMP, MYSQLDUMP};
use db_backup_manager::managers::notification::build_report;
use rstest::rstest;
use test_utils::{
    fake_mongodump_output, fixed_time, tools_downloader, ConfigBuilder, MockDistributor, MockExecutor,
    MockNotifier, MockResponse, RunOutcome, TestContext,
};

fn mysqldump_ok() -> MockExecutor {
    MockExecutor::new().expect(
        MYSQLDUMP,
        MockResponse::Success {
            stdout: "-- MySQL dump\nCREATE TABLE orders (id INT);\n".to_string(),
            stderr: String::new(),
        },
    )
}

fn mongodump_ok() -> MockExecutor {
    MockExecutor::new().on_call(MONGODUMP, fake_mongodump_output)
}

#[test]
fn test_mysql_run_end_to_end() {
    let ctx = TestContext::from_builder(ConfigBuilder::mysql()).with_executor(mysqldump_ok());

    let outcome = ctx.manager().run();

    let artifact = outcome.artifact().expect("successful run");
    assert_eq!(artifact.file_name(), "mysql_orders_20240301_100000.sql.gz");
    assert_eq!(ctx.backup_files(), vec!["mysql_orders_20240301_100000.sql.gz"]);
    assert_eq!(ctx.distributor.uploads(), vec![artifact.path.clone()]);

    let calls = ctx.notifier.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].success);
    assert_eq!(calls[0].size_bytes, Some(artifact.size_bytes));
}

#[test]
fn test_mongodb_first_run_provisions_tools() {
    let ctx = TestContext::from_builder(ConfigBuilder::mongodb_uri(
        "mongodb://backup:pw@db.example.com:27017/mydb?authSource=admin",
    ))
    .with_executor(mongodump_ok())
    .with_downloader(tools_downloader());

    let outcome = ctx.manager().run();

    let artifact = outcome.artifact().expect("successful run");
    assert_eq!(artifact.file_name(), "mongodb_mydb_20240301_100000.tar.gz");
    assert!(artifact.size_mib() > 0.0);
    assert_eq!(ctx.downloader.request_count(), 1);
    assert_eq!(ctx.config_dir_entries(), vec!["mongodb-tools"]);

    let call = &ctx.executor.get_calls()[0];
    assert_eq!(
        std::path::PathBuf::from(&call.program),
        ctx.config_dir().join("mongodb-tools/bin/mongodump")
    );
    assert_eq!(
        call.args[0],
        "--uri=mongodb://backup:pw@db.example.com:27017/mydb?authSource=admin"
    );

    assert_eq!(ctx.notifier.call_count(), 1);
    assert!(ctx.notifier.calls()[0].success);
}

#[test]
fn test_uri_only_report_names_database_from_uri() {
    let ctx = TestContext::from_builder(ConfigBuilder::mongodb_uri(
        "mongodb://backup:pw@db.example.com:27017/mydb",
    ))
    .with_executor(mongodump_ok())
    .with_downloader(tools_downloader());

    let outcome = ctx.manager().run();

    let calls = ctx.notifier.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].database, "mydb");

    let report = build_report(&calls[0].database, outcome.artifact(), calls[0].success, fixed_time());
    assert!(report.body.contains("Database: mydb\n"));
}

#[test]
fn test_mongodb_second_run_skips_download() {
    let ctx = TestContext::from_builder(ConfigBuilder::mongodb_params("mydb", 27017))
        .with_executor(mongodump_ok())
        .with_downloader(tools_downloader());

    assert!(ctx.manager().run().is_success());
    assert!(ctx.manager().run().is_success());

    assert_eq!(ctx.downloader.request_count(), 1);
    assert_eq!(ctx.executor.call_count(MONGODUMP), 2);
}

#[rstest]
#[case::mysql(ConfigBuilder::mysql(), MYSQLDUMP)]
#[case::mongodb(ConfigBuilder::mongodb_params("mydb", 27017), MONGODUMP)]
fn test_dump_failure_notifies_once(#[case] builder: ConfigBuilder, #[case] program: &str) {
    let executor = MockExecutor::new().expect(
        program,
        MockResponse::Failure {
            stderr: "Access denied for user".to_string(),
            exit_code: 2,
        },
    );
    let ctx = TestContext::from_builder(builder)
        .with_executor(executor)
        .with_downloader(tools_downloader());

    let outcome = ctx.manager().run();

    assert!(matches!(outcome, RunOutcome::Failure(_)));
    assert!(ctx.backup_files().is_empty());
    assert_eq!(ctx.distributor.upload_count(), 0);

    let calls = ctx.notifier.calls();
    assert_eq!(calls.len(), 1);
    assert!(!calls[0].success);
    assert_eq!(calls[0].artifact, None);
}

#[test]
fn test_provision_failure_notifies_once() {
    let ctx = TestContext::from_builder(ConfigBuilder::mongodb_params("mydb", 27017));

    let outcome = ctx.manager().run();

    assert!(!outcome.is_success());
    assert!(!ctx.executor.was_called(MONGODUMP));
    assert_eq!(ctx.notifier.call_count(), 1);
    assert!(ctx.config_dir_entries().is_empty());
}

#[test]
fn test_dump_timeout_is_failure() {
    let executor = MockExecutor::new().expect(MYSQLDUMP, MockResponse::Timeout);
    let ctx = TestContext::from_builder(ConfigBuilder::mysql().with_dump_timeout(1))
        .with_executor(executor);

    assert!(!ctx.manager().run().is_success());
    assert!(ctx.backup_files().is_empty());
    assert_eq!(ctx.notifier.call_count(), 1);
}

#[test]
fn test_upload_failure_keeps_success() {
    let ctx = TestContext::from_builder(ConfigBuilder::mysql())
        .with_executor(mysqldump_ok())
        .with_distributor(MockDistributor::failing("550 Permission denied"));

    let outcome = ctx.manager().run();

    assert!(outcome.is_success());
    assert_eq!(ctx.backup_files().len(), 1);
    assert_eq!(ctx.notifier.call_count(), 1);
    assert!(ctx.notifier.calls()[0].success);
}

#[test]
fn test_notification_failure_is_swallowed() {
    let ctx = TestContext::from_builder(ConfigBuilder::mysql())
        .with_executor(mysqldump_ok())
        .with_notifier(MockNotifier::failing("SMTP connection refused"));

    assert!(ctx.manager().run().is_success());
}

#[rstest]
#[case::unknown("postgres")]
#[case::empty("")]
fn test_unsupported_engine(#[case] db_type: &str) {
    let ctx = TestContext::from_builder(ConfigBuilder::mysql().with_db_type(db_type));

    let outcome = ctx.manager().run();

    assert!(matches!(outcome, RunOutcome::Failure(ref reason) if reason.contains("Unsupported")));
    assert!(ctx.executor.get_calls().is_empty());
    assert_eq!(ctx.downloader.request_count(), 0);
    assert_eq!(ctx.notifier.call_count(), 1);
    assert!(!ctx.notifier.calls()[0].success);
}
