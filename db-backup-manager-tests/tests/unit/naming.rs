//! Target resolution and artifact naming

use chrono::NaiveDate;
use db_backup_manager::target::{database_from_uri, BackupTarget, Connection, Engine, TargetError};
use rstest::rstest;
use test_utils::DatabaseConfig;

fn database(db_type: &str, name: Option<&str>, uri: Option<&str>) -> DatabaseConfig {
    DatabaseConfig {
        db_type: Some(db_type.to_string()),
        name: name.map(str::to_string),
        connection_string: uri.map(str::to_string),
        ..DatabaseConfig::default()
    }
}

#[rstest]
#[case("mysql", Some("orders"), None, "mysql_orders_20240301_100000")]
#[case("mongodb", Some("mydb"), None, "mongodb_mydb_20240301_100000")]
#[case("mongodb", None, Some("mongodb://u:p@h:27017/mydb?authSource=admin"), "mongodb_mydb_20240301_100000")]
fn test_dump_stem(
    #[case] db_type: &str,
    #[case] name: Option<&str>,
    #[case] uri: Option<&str>,
    #[case] expected: &str,
) {
    let target = BackupTarget::from_config(&database(db_type, name, uri)).unwrap();
    let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    assert_eq!(target.dump_stem(&ts), expected);
}

#[rstest]
#[case("mongodb://host/mydb", Some("mydb"))]
#[case("mongodb+srv://u:p@cluster.example.net/sales?retryWrites=true", Some("sales"))]
#[case("mongodb://host:27017/", None)]
#[case("mongodb://host:27017", None)]
#[case("not a uri", None)]
fn test_database_from_uri(#[case] uri: &str, #[case] expected: Option<&str>) {
    assert_eq!(database_from_uri(uri).as_deref(), expected);
}

#[test]
fn test_engine_identifiers() {
    assert_eq!(Engine::parse("mysql").unwrap(), Engine::Relational);
    assert_eq!(Engine::parse("mongodb").unwrap(), Engine::Document);
    assert_eq!(Engine::Relational.to_string(), "mysql");
    assert_eq!(
        Engine::parse("sqlite").unwrap_err(),
        TargetError::UnsupportedEngine("sqlite".to_string())
    );
}

#[test]
fn test_missing_name_without_uri() {
    let err = BackupTarget::from_config(&database("mongodb", None, None)).unwrap_err();
    assert_eq!(err, TargetError::MissingField("database.name"));
}

#[test]
fn test_uri_wins_over_params() {
    let mut config = database("mongodb", Some("mydb"), Some("mongodb://u:p@h/mydb"));
    config.port = Some(27018);
    config.username = Some("admin".to_string());

    let target = BackupTarget::from_config(&config).unwrap();
    assert_eq!(target.connection, Connection::Uri("mongodb://u:p@h/mydb".to_string()));
}
