//! ClickHouse strategies.
//!
//! ClickHouse has no multi-statement transactions, so every builder returns
//! a batch that the caller runs statement by statement.

use crate::ansi::{append_sql, require_columns, require_incremental_key, time_window, unsupported, view_sql};
use crate::error::{MaterializeError, MaterializeResult};
use crate::registry::{BuildContext, MaterializedSql, Registry, TEMP_TABLE_PREFIX};
use matc_core::sql_utils::escape_sql_string;
use matc_core::{Asset, MaterializationStrategy as S, MaterializationType as T};

pub fn registry() -> Registry {
    Registry::new()
        .with(T::View, S::None, build_view)
        .with(T::View, S::Append, unsupported)
        .with(T::View, S::CreateReplace, unsupported)
        .with(T::View, S::DeleteInsert, unsupported)
        .with(T::Table, S::None, build_create_replace)
        .with(T::Table, S::Append, build_append)
        .with(T::Table, S::CreateReplace, build_create_replace)
        .with(T::Table, S::DeleteInsert, build_delete_insert)
        .with(T::Table, S::Merge, unsupported)
        .with(T::Table, S::TimeInterval, build_time_interval)
        .with(T::Table, S::Ddl, build_ddl)
}

fn build_view(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    Ok(vec![view_sql(asset, query)].into())
}

fn build_append(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    Ok(vec![append_sql(asset, query)].into())
}

/// The single primary-key column the staging table is keyed on
fn single_primary_key(asset: &Asset, strategy: S) -> MaterializeResult<&str> {
    require_columns(asset, strategy)?;
    match asset.primary_keys().as_slice() {
        [key] => Ok(*key),
        _ => Err(MaterializeError::invalid(format!(
            "materialization strategy {strategy} requires the `primary_key` field to be set on at EXACTLY one column"
        ))),
    }
}

fn build_create_replace(
    asset: &Asset,
    query: &str,
    ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let key = single_primary_key(asset, asset.materialization.strategy)?;
    let tmp = ctx.temp_table(TEMP_TABLE_PREFIX);
    let name = &asset.name;

    Ok(vec![
        format!("CREATE TABLE {tmp} PRIMARY KEY {key} AS {query}"),
        format!("DROP TABLE IF EXISTS {name}"),
        format!("RENAME TABLE {tmp} TO {name}"),
    ]
    .into())
}

fn build_delete_insert(
    asset: &Asset,
    query: &str,
    ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let incremental = require_incremental_key(asset, S::DeleteInsert)?;
    let key = single_primary_key(asset, S::DeleteInsert)?;
    let tmp = ctx.temp_table(TEMP_TABLE_PREFIX);
    let name = &asset.name;

    Ok(vec![
        format!("CREATE TABLE {tmp} PRIMARY KEY {key} AS {query}"),
        format!(
            "DELETE FROM {name} WHERE {incremental} in (SELECT DISTINCT {incremental} FROM {tmp})"
        ),
        format!("INSERT INTO {name} SELECT * FROM {tmp}"),
        format!("DROP TABLE IF EXISTS {tmp}"),
    ]
    .into())
}

fn build_time_interval(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let (key, start, end) = time_window(asset)?;
    Ok(vec![
        format!(
            "DELETE FROM {} WHERE {key} BETWEEN '{start}' AND '{end}'",
            asset.name
        ),
        append_sql(asset, query),
    ]
    .into())
}

fn build_ddl(
    asset: &Asset,
    _query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    require_columns(asset, S::Ddl)?;

    let definitions = asset
        .columns
        .iter()
        .map(|col| {
            if col.description.is_empty() {
                format!("{} {}", col.name, col.data_type)
            } else {
                format!(
                    "{} {} COMMENT '{}'",
                    col.name,
                    col.data_type,
                    escape_sql_string(&col.description)
                )
            }
        })
        .collect::<Vec<_>>();

    let mut ddl = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
        asset.name,
        definitions.join(",\n")
    );
    let primary_keys = asset.primary_keys();
    if !primary_keys.is_empty() {
        ddl.push_str(&format!("\nPRIMARY KEY ({})", primary_keys.join(", ")));
    }
    if let Some(partition) = asset.materialization.partition_by() {
        ddl.push_str(&format!("\nPARTITION BY ({partition})"));
    }
    Ok(vec![ddl].into())
}

#[cfg(test)]
#[path = "clickhouse_test.rs"]
mod tests;
