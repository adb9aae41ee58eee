use super::*;

#[test]
fn test_parse_asset_yaml() {
    let yaml = r#"
name: analytics.orders
type: pg.sql
columns:
  - name: id
    type: integer
    primary_key: true
  - name: amount
    type: numeric
    update_on_merge: true
    nullable: false
materialization:
  type: table
  strategy: delete+insert
  incremental_key: id
  time_granularity: timestamp
  cluster_by: [id]
"#;
    let asset: Asset = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(asset.name, "analytics.orders");
    assert_eq!(asset.asset_type, "pg.sql");
    assert_eq!(asset.primary_keys(), vec!["id"]);
    let merged: Vec<&str> = asset.merge_columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(merged, vec!["amount"]);
    assert!(asset.columns[0].nullable);
    assert!(!asset.columns[1].nullable);
    assert_eq!(asset.materialization.kind, MaterializationType::Table);
    assert_eq!(
        asset.materialization.strategy,
        MaterializationStrategy::DeleteInsert
    );
    assert_eq!(asset.materialization.incremental_key(), Some("id"));
    assert_eq!(
        asset.materialization.time_granularity,
        Some(TimeGranularity::Timestamp)
    );
    assert_eq!(asset.materialization.cluster_by, vec!["id"]);
}

#[test]
fn test_missing_materialization_is_none() {
    let asset: Asset = serde_yaml::from_str("name: raw_query").unwrap();
    assert_eq!(asset.materialization.kind, MaterializationType::None);
    assert_eq!(asset.materialization.strategy, MaterializationStrategy::None);
}

#[test]
fn test_strategy_strings() {
    for strategy in MaterializationStrategy::ALL {
        let s = strategy.to_string();
        let parsed: MaterializationStrategy = serde_yaml::from_str(&format!("'{s}'")).unwrap();
        assert_eq!(parsed, strategy);
    }
    let none: MaterializationStrategy = serde_yaml::from_str("none").unwrap();
    assert_eq!(none, MaterializationStrategy::None);
}

#[test]
fn test_unknown_strategy_rejected() {
    let result: Result<MaterializationStrategy, _> = serde_yaml::from_str("upsert");
    assert!(result.is_err());
}

#[test]
fn test_schema_name_by_part_count() {
    assert_eq!(Asset::new("table").schema_name(), None);
    assert_eq!(Asset::new("schema.table").schema_name(), Some("schema"));
    assert_eq!(Asset::new("project.dataset.table").schema_name(), Some("dataset"));
    assert_eq!(Asset::new("a.b.c.d").schema_name(), None);
}

#[test]
fn test_column_lookup_is_case_insensitive() {
    let asset = Asset::new("t").with_columns(vec![Column::new("UpdatedAt", "timestamp")]);
    assert_eq!(asset.column("updatedat").map(|c| c.data_type.as_str()), Some("timestamp"));
    assert!(asset.column("missing").is_none());
}

#[test]
fn test_blank_incremental_key_is_none() {
    let mat = Materialization {
        incremental_key: Some("  ".to_string()),
        ..Materialization::table(MaterializationStrategy::DeleteInsert)
    };
    assert_eq!(mat.incremental_key(), None);
}

#[test]
fn test_granularity_placeholders() {
    assert_eq!(
        TimeGranularity::Date.placeholders(),
        ("{{start_date}}", "{{end_date}}")
    );
    assert_eq!(
        TimeGranularity::Timestamp.placeholders(),
        ("{{start_timestamp}}", "{{end_timestamp}}")
    );
}

#[test]
fn test_blank_merge_sql_is_ignored() {
    let col = Column::new("x", "int").with_merge_sql("  ");
    assert_eq!(col.merge_expression(), None);
    let col = Column::new("x", "int").with_merge_sql("GREATEST(target.x, source.x)");
    assert_eq!(col.merge_expression(), Some("GREATEST(target.x, source.x)"));
}

#[test]
fn test_merge_columns_include_merge_sql_overrides() {
    let asset = Asset::new("s.t").with_columns(vec![
        Column::new("id", "int").primary_key(),
        Column::new("name", "text").update_on_merge(),
        Column::new("total", "int").with_merge_sql("target.total + source.total"),
        Column::new("note", "text").with_merge_sql(""),
    ]);
    let names: Vec<&str> = asset.merge_columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["name", "total"]);
}
