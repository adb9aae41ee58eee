//! Shared test utilities for matc-materialize

use crate::registry::{MaterializedSql, Materializer, Registry};
use matc_core::{Asset, Column, Materialization, MaterializationStrategy, TimeGranularity};

/// Temp suffix every test materializer produces
pub(crate) const FIXED_SUFFIX: &str = "abcefghi";

/// Materializer with deterministic temp names
pub(crate) fn materializer(registry: Registry, full_refresh: bool) -> Materializer {
    Materializer::new(registry, full_refresh).with_temp_names(|| FIXED_SUFFIX.to_string())
}

/// Statements of a rendered asset in execution order
pub(crate) fn statements(sql: &MaterializedSql) -> Vec<&str> {
    match sql {
        MaterializedSql::Single(sql) => vec![sql.as_str()],
        MaterializedSql::Batch(statements) => statements.iter().map(String::as_str).collect(),
    }
}

/// `my.asset` as a table with the given strategy
pub(crate) fn table(strategy: MaterializationStrategy) -> Asset {
    Asset::new("my.asset").with_materialization(Materialization::table(strategy))
}

pub(crate) fn view(strategy: MaterializationStrategy) -> Asset {
    let mut mat = Materialization::view();
    mat.strategy = strategy;
    Asset::new("my.asset").with_materialization(mat)
}

pub(crate) fn with_key(mut asset: Asset, key: &str) -> Asset {
    asset.materialization.incremental_key = Some(key.to_string());
    asset
}

pub(crate) fn with_granularity(mut asset: Asset, granularity: TimeGranularity) -> Asset {
    asset.materialization.time_granularity = Some(granularity);
    asset
}

/// id (pk), name (update_on_merge), price (merge_sql), created_at
pub(crate) fn merge_columns() -> Vec<Column> {
    vec![
        Column::new("id", "int").primary_key(),
        Column::new("name", "varchar").update_on_merge(),
        Column::new("price", "numeric").with_merge_sql("GREATEST(target.price, source.price)"),
        Column::new("created_at", "timestamp"),
    ]
}

/// id (pk), col_a, col_b
pub(crate) fn scd2_columns() -> Vec<Column> {
    vec![
        Column::new("id", "int").primary_key(),
        Column::new("col_a", "varchar"),
        Column::new("col_b", "int"),
    ]
}

/// id (pk), event_name, ts (timestamp)
pub(crate) fn scd2_time_columns() -> Vec<Column> {
    vec![
        Column::new("id", "int").primary_key(),
        Column::new("event_name", "varchar"),
        Column::new("ts", "timestamp"),
    ]
}
