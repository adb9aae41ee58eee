//! MySQL strategies.
//!
//! MySQL has no MERGE, so merge stages the query in a temporary table,
//! deletes the matched target rows and re-inserts from staging. SCD2 is not
//! supported.

use crate::ansi::{
    append_sql, build_append, build_view, key_equalities, merge_assignments,
    require_incremental_key, require_columns, require_merge_keys, script, time_window,
    unsupported,
};
use crate::error::{MaterializeError, MaterializeResult};
use crate::registry::{BuildContext, MaterializedSql, Registry, MERGE_TEMP_PREFIX, TEMP_TABLE_PREFIX};
use matc_core::sql_utils::escape_sql_string;
use matc_core::{Asset, MaterializationStrategy as S, MaterializationType as T};

pub fn registry() -> Registry {
    Registry::new()
        .with(T::View, S::None, build_view)
        .with(T::View, S::Append, unsupported)
        .with(T::View, S::CreateReplace, unsupported)
        .with(T::View, S::DeleteInsert, unsupported)
        .with(T::View, S::Merge, unsupported)
        .with(T::View, S::Ddl, unsupported)
        .with(T::Table, S::None, build_create_replace)
        .with(T::Table, S::Append, build_append)
        .with(T::Table, S::CreateReplace, build_create_replace)
        .with(T::Table, S::DeleteInsert, build_delete_insert)
        .with(T::Table, S::TruncateInsert, build_truncate_insert)
        .with(T::Table, S::Merge, build_merge)
        .with(T::Table, S::TimeInterval, build_time_interval)
        .with(T::Table, S::Ddl, build_ddl)
        .with(T::Table, S::Scd2ByColumn, unsupported)
        .with(T::Table, S::Scd2ByTime, unsupported)
}

fn build_create_replace(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let strategy = asset.materialization.strategy;
    if strategy.is_scd2() {
        return Err(MaterializeError::invalid(format!(
            "materialization strategy {strategy} is not supported during full refresh for MySQL"
        )));
    }
    let name = &asset.name;
    Ok(format!("DROP TABLE IF EXISTS {name};\nCREATE TABLE {name} AS\n{query};").into())
}

fn build_delete_insert(
    asset: &Asset,
    query: &str,
    ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let key = require_incremental_key(asset, S::DeleteInsert)?;
    let tmp = ctx.temp_table(TEMP_TABLE_PREFIX);
    let name = &asset.name;

    Ok(script(&[
        "START TRANSACTION".to_string(),
        format!("DROP TEMPORARY TABLE IF EXISTS {tmp}"),
        format!("CREATE TEMPORARY TABLE {tmp} AS {query}"),
        format!("DELETE FROM {name} WHERE {key} IN (SELECT DISTINCT {key} FROM {tmp})"),
        format!("INSERT INTO {name} SELECT * FROM {tmp}"),
        format!("DROP TEMPORARY TABLE IF EXISTS {tmp}"),
        "COMMIT".to_string(),
    ])
    .into())
}

fn build_truncate_insert(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    Ok(script(&[
        "START TRANSACTION".to_string(),
        format!("TRUNCATE TABLE {}", asset.name),
        append_sql(asset, query),
        "COMMIT".to_string(),
    ])
    .into())
}

fn build_time_interval(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let (key, start, end) = time_window(asset)?;

    Ok(script(&[
        "START TRANSACTION".to_string(),
        format!(
            "DELETE FROM {} WHERE {key} BETWEEN '{start}' AND '{end}'",
            asset.name
        ),
        append_sql(asset, query),
        "COMMIT".to_string(),
    ])
    .into())
}

fn build_ddl(
    asset: &Asset,
    _query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    require_columns(asset, S::Ddl)?;

    let mut definitions: Vec<String> = asset
        .columns
        .iter()
        .map(|col| {
            let mut definition = format!("{} {}", col.name, col.data_type);
            if !col.nullable {
                definition.push_str(" NOT NULL");
            }
            if !col.description.is_empty() {
                definition.push_str(&format!(
                    " COMMENT '{}'",
                    escape_sql_string(&col.description)
                ));
            }
            definition
        })
        .collect();
    let primary_keys = asset.primary_keys();
    if !primary_keys.is_empty() {
        definitions.push(format!("PRIMARY KEY ({})", primary_keys.join(", ")));
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
        asset.name,
        definitions.join(",\n")
    )
    .into())
}

/// Merge by delete and re-insert.
///
/// Matched target rows are replaced wholesale by the staged rows, so a
/// column without `update_on_merge` or `merge_sql` takes the source value
/// instead of keeping the target value as it does on the other dialects.
/// Merge expressions are applied to the staged rows first.
fn build_merge(
    asset: &Asset,
    query: &str,
    ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let keys = require_merge_keys(asset)?;
    let tmp = ctx.temp_table(MERGE_TEMP_PREFIX);
    let name = &asset.name;
    let on = key_equalities(&keys, "target", "source");
    let columns = asset.column_names();
    let source_columns = columns
        .iter()
        .map(|c| format!("source.{c}"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut statements = vec![
        "START TRANSACTION".to_string(),
        format!("DROP TEMPORARY TABLE IF EXISTS {tmp}"),
        format!("CREATE TEMPORARY TABLE {tmp} AS\n{query}"),
    ];
    // Merge expressions are folded into the staged rows before the swap
    let assignments = merge_assignments(asset, "source.", str::to_string);
    if !assignments.is_empty() {
        statements.push(format!(
            "UPDATE {tmp} AS source JOIN {name} AS target ON {on} SET {}",
            assignments.join(", ")
        ));
    }
    statements.extend([
        format!("DELETE target FROM {name} AS target JOIN {tmp} AS source ON {on}"),
        format!(
            "INSERT INTO {name} ({})\nSELECT {source_columns}\nFROM {tmp} AS source",
            columns.join(", ")
        ),
        format!("DROP TEMPORARY TABLE IF EXISTS {tmp}"),
        "COMMIT".to_string(),
    ]);
    Ok(script(&statements).into())
}

#[cfg(test)]
#[path = "mysql_test.rs"]
mod tests;
