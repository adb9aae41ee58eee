use super::*;
use crate::test_utils::*;
use matc_core::{Column, TimeGranularity};

fn render(asset: &Asset, query: &str) -> MaterializeResult<MaterializedSql> {
    materializer(registry(), false).render(asset, query)
}

fn keyed(asset: Asset) -> Asset {
    asset.with_columns(vec![
        Column::new("id", "UInt64").primary_key(),
        Column::new("dt", "Date"),
    ])
}

#[test]
fn test_view_is_single_statement_batch() {
    let out = render(&view(S::None), "SELECT 1;").unwrap();
    assert_eq!(statements(&out), vec!["CREATE OR REPLACE VIEW my.asset AS\nSELECT 1"]);
}

#[test]
fn test_create_replace_swaps_tables() {
    let out = render(&keyed(table(S::CreateReplace)), "SELECT * FROM src;").unwrap();
    assert_eq!(
        statements(&out),
        vec![
            "CREATE TABLE __bruin_tmp_abcefghi PRIMARY KEY id AS SELECT * FROM src",
            "DROP TABLE IF EXISTS my.asset",
            "RENAME TABLE __bruin_tmp_abcefghi TO my.asset",
        ]
    );
    assert_eq!(
        out.joined(";"),
        "CREATE TABLE __bruin_tmp_abcefghi PRIMARY KEY id AS SELECT * FROM src;\
         DROP TABLE IF EXISTS my.asset;\
         RENAME TABLE __bruin_tmp_abcefghi TO my.asset"
    );
}

#[test]
fn test_create_replace_needs_exactly_one_primary_key() {
    let two = table(S::CreateReplace).with_columns(vec![
        Column::new("a", "UInt64").primary_key(),
        Column::new("b", "UInt64").primary_key(),
    ]);
    assert_eq!(
        render(&two, "SELECT 1").unwrap_err().to_string(),
        "[M009] materialization strategy create+replace requires the `primary_key` field to be set on at EXACTLY one column"
    );
    assert!(matches!(
        render(&table(S::CreateReplace), "SELECT 1").unwrap_err(),
        MaterializeError::MissingColumns { .. }
    ));
}

#[test]
fn test_delete_insert() {
    let asset = keyed(with_key(table(S::DeleteInsert), "dt"));
    let out = render(&asset, "SELECT * FROM src").unwrap();
    assert_eq!(
        statements(&out),
        vec![
            "CREATE TABLE __bruin_tmp_abcefghi PRIMARY KEY id AS SELECT * FROM src",
            "DELETE FROM my.asset WHERE dt in (SELECT DISTINCT dt FROM __bruin_tmp_abcefghi)",
            "INSERT INTO my.asset SELECT * FROM __bruin_tmp_abcefghi",
            "DROP TABLE IF EXISTS __bruin_tmp_abcefghi",
        ]
    );
    assert!(matches!(
        render(&keyed(table(S::DeleteInsert)), "SELECT 1").unwrap_err(),
        MaterializeError::MissingIncrementalKey { .. }
    ));
}

#[test]
fn test_time_interval() {
    let asset = with_granularity(with_key(table(S::TimeInterval), "dt"), TimeGranularity::Date);
    let out = render(&asset, "SELECT 1").unwrap();
    assert_eq!(
        statements(&out),
        vec![
            "DELETE FROM my.asset WHERE dt BETWEEN '{{start_date}}' AND '{{end_date}}'",
            "INSERT INTO my.asset SELECT 1",
        ]
    );
}

#[test]
fn test_ddl_with_partition() {
    let mut asset = table(S::Ddl).with_columns(vec![
        Column::new("id", "UInt64").primary_key(),
        Column::new("dt", "Date").with_description("event day"),
    ]);
    asset.materialization.partition_by = Some("toYYYYMM(dt)".to_string());
    let out = render(&asset, "").unwrap();
    assert_eq!(
        statements(&out),
        vec!["CREATE TABLE IF NOT EXISTS my.asset (\n\
              id UInt64,\n\
              dt Date COMMENT 'event day'\n\
              )\n\
              PRIMARY KEY (id)\n\
              PARTITION BY (toYYYYMM(dt))"]
    );
}

#[test]
fn test_rejected_strategies() {
    assert!(matches!(
        render(&keyed(table(S::Merge)), "SELECT 1").unwrap_err(),
        MaterializeError::UnsupportedStrategy { .. }
    ));
    assert!(matches!(
        render(&keyed(table(S::TruncateInsert)), "SELECT 1").unwrap_err(),
        MaterializeError::UnsupportedCombination { .. }
    ));
    assert!(matches!(
        render(&keyed(with_key(table(S::Scd2ByTime), "dt")), "SELECT 1").unwrap_err(),
        MaterializeError::UnsupportedCombination { .. }
    ));
}
