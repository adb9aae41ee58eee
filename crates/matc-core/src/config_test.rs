use super::*;
use std::io::Write;
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
fn test_dialect_aliases() {
    assert_eq!("bq".parse::<Dialect>().unwrap(), Dialect::BigQuery);
    assert_eq!("PG".parse::<Dialect>().unwrap(), Dialect::Postgres);
    assert_eq!("rs".parse::<Dialect>().unwrap(), Dialect::Redshift);
    assert_eq!("ch".parse::<Dialect>().unwrap(), Dialect::ClickHouse);
    assert!("snowflake".parse::<Dialect>().is_err());
}

#[test]
fn test_dialect_from_asset_type() {
    assert_eq!(Dialect::from_asset_type("bq.sql"), Some(Dialect::BigQuery));
    assert_eq!(Dialect::from_asset_type("duckdb.sql"), Some(Dialect::DuckDb));
    assert_eq!(Dialect::from_asset_type("rs.sensor.table"), Some(Dialect::Redshift));
    assert_eq!(Dialect::from_asset_type("python"), None);
}

#[test]
fn test_display_round_trips_through_from_str() {
    for dialect in Dialect::ALL {
        assert_eq!(dialect.to_string().parse::<Dialect>().unwrap(), dialect);
    }
}

#[test]
fn test_load_config_defaults() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "matc.yml", "dialect: bigquery\n");
    let config = CompilerConfig::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.dialect, Dialect::BigQuery);
    assert!(!config.full_refresh);
    assert_eq!(config.extractor_kind(), ExtractorKind::WholeFile);
}

#[test]
fn test_load_config_full() {
    let dir = TempDir::new().unwrap();
    write_file(
        &dir,
        "matc.yaml",
        r#"
dialect: postgres
full_refresh: true
extractor: whole_file
pipeline: nightly
start_date: "2024-01-01"
end_date: "2024-01-02T00:00:00Z"
vars:
  region: eu
"#,
    );
    let config = CompilerConfig::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.dialect, Dialect::Postgres);
    assert!(config.full_refresh);
    assert_eq!(config.extractor_kind(), ExtractorKind::WholeFile);
    assert_eq!(config.pipeline, "nightly");
    assert_eq!(config.vars["region"], serde_json::json!("eu"));
}

#[test]
fn test_invalid_start_date() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "matc.yml", "start_date: yesterday\n");
    let err = CompilerConfig::load(&path).unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
}

#[test]
fn test_unknown_field_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "matc.yml", "dialekt: duckdb\n");
    assert!(matches!(
        CompilerConfig::load(&path),
        Err(CoreError::YamlParse(_))
    ));
}

#[test]
fn test_missing_config() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        CompilerConfig::load_from_dir(dir.path()),
        Err(CoreError::ConfigNotFound { .. })
    ));
}

#[test]
fn test_load_environment() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "environment.yml", "name: dev\nschema_prefix: dev_\n");
    let env = DevEnvironment::load(&path).unwrap();
    assert_eq!(env, DevEnvironment::new("dev", "dev_"));
}
