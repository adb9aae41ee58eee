//! Builders and validation shared by several dialects.

use crate::error::{MaterializeError, MaterializeResult};
use crate::registry::{BuildContext, MaterializedSql};
use matc_core::{Asset, Column, MaterializationStrategy};

/// Bookkeeping columns added by SCD2 strategies
pub const SCD2_COLUMNS: [&str; 3] = ["_valid_from", "_valid_until", "_is_current"];

/// `CREATE OR REPLACE VIEW <name> AS\n<query>`
pub fn build_view(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    Ok(view_sql(asset, query).into())
}

pub(crate) fn view_sql(asset: &Asset, query: &str) -> String {
    format!("CREATE OR REPLACE VIEW {} AS\n{}", asset.name, query)
}

/// Builder registered for pairs a dialect explicitly rejects
pub fn unsupported(
    asset: &Asset,
    _query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    Err(MaterializeError::UnsupportedStrategy {
        strategy: asset.materialization.strategy,
        kind: asset.materialization.kind,
        asset_type: asset.asset_type.clone(),
    })
}

/// `INSERT INTO <name> <query>`
pub fn build_append(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    Ok(append_sql(asset, query).into())
}

pub(crate) fn append_sql(asset: &Asset, query: &str) -> String {
    format!("INSERT INTO {} {}", asset.name, query)
}

/// Truncate then insert inside one transaction
pub fn build_truncate_insert(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    Ok(script(&[
        "BEGIN TRANSACTION".to_string(),
        format!("TRUNCATE TABLE {}", asset.name),
        append_sql(asset, query),
        "COMMIT".to_string(),
    ])
    .into())
}

/// Join statements with `;\n` and terminate the last one
pub(crate) fn script(statements: &[String]) -> String {
    format!("{};", statements.join(";\n"))
}

pub(crate) fn require_incremental_key(
    asset: &Asset,
    strategy: MaterializationStrategy,
) -> MaterializeResult<&str> {
    asset
        .materialization
        .incremental_key()
        .ok_or(MaterializeError::MissingIncrementalKey { strategy })
}

pub(crate) fn require_columns(
    asset: &Asset,
    strategy: MaterializationStrategy,
) -> MaterializeResult<()> {
    if asset.columns.is_empty() {
        return Err(MaterializeError::MissingColumns { strategy });
    }
    Ok(())
}

pub(crate) fn require_primary_keys(
    asset: &Asset,
    strategy: MaterializationStrategy,
) -> MaterializeResult<Vec<&str>> {
    let keys = asset.primary_keys();
    if keys.is_empty() {
        return Err(MaterializeError::MissingPrimaryKey { strategy });
    }
    Ok(keys)
}

/// Columns must be declared and at least one must be a primary key
pub(crate) fn require_merge_keys(asset: &Asset) -> MaterializeResult<Vec<&str>> {
    let strategy = asset.materialization.strategy;
    require_columns(asset, strategy)?;
    require_primary_keys(asset, strategy)
}

/// Incremental key plus the `{{start_X}}`/`{{end_X}}` placeholder pair
pub(crate) fn time_window(asset: &Asset) -> MaterializeResult<(&str, &'static str, &'static str)> {
    let key = require_incremental_key(asset, MaterializationStrategy::TimeInterval)?;
    let granularity = asset
        .materialization
        .time_granularity
        .ok_or(MaterializeError::MissingTimeGranularity)?;
    let (start, end) = granularity.placeholders();
    Ok((key, start, end))
}

pub(crate) fn reject_reserved(asset: &Asset, reserved: &[&str]) -> MaterializeResult<()> {
    match asset
        .columns
        .iter()
        .find(|c| reserved.contains(&c.name.as_str()))
    {
        Some(col) => Err(MaterializeError::ReservedColumn {
            column: col.name.clone(),
        }),
        None => Ok(()),
    }
}

/// The incremental key column, when declared, must be `timestamp` or `date`
pub(crate) fn require_temporal_key(asset: &Asset, key: &str) -> MaterializeResult<()> {
    if let Some(col) = asset.column(key) {
        let ty = col.data_type.to_lowercase();
        if ty != "timestamp" && ty != "date" {
            return Err(MaterializeError::invalid(
                "incremental_key must be TIMESTAMP or DATE in SCD2_by_time strategy",
            ));
        }
    }
    Ok(())
}

/// `WHEN MATCHED` assignments: `<lhs><col> = merge_sql | source.<col>`
pub(crate) fn merge_assignments(
    asset: &Asset,
    lhs_prefix: &str,
    ident: impl Fn(&str) -> String,
) -> Vec<String> {
    asset
        .merge_columns()
        .into_iter()
        .map(|col: &Column| {
            let name = ident(&col.name);
            match col.merge_expression() {
                Some(expr) => format!("{}{} = {}", lhs_prefix, name, expr),
                None => format!("{}{} = source.{}", lhs_prefix, name, name),
            }
        })
        .collect()
}

/// `left.k = right.k AND ...`
pub(crate) fn key_equalities<K: AsRef<str>>(keys: &[K], left: &str, right: &str) -> String {
    keys.iter()
        .map(|k| {
            let k = k.as_ref();
            format!("{left}.{k} = {right}.{k}")
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// NULL-safe `(left.k = right.k OR (left.k IS NULL AND right.k IS NULL)) AND ...`
pub(crate) fn null_safe_equalities(keys: &[&str], left: &str, right: &str) -> String {
    keys.iter()
        .map(|k| format!("({left}.{k} = {right}.{k} OR ({left}.{k} IS NULL AND {right}.{k} IS NULL))"))
        .collect::<Vec<_>>()
        .join(" AND ")
}

#[cfg(test)]
#[path = "ansi_test.rs"]
mod tests;
