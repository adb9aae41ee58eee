//! BigQuery strategies.
//!
//! BigQuery scripts support `BEGIN TRANSACTION`/`COMMIT TRANSACTION` but not
//! around TRUNCATE, so truncate+insert runs as two plain statements. MERGE
//! key matching is NULL-safe.

use crate::ansi::{
    build_append, build_view, merge_assignments, null_safe_equalities, reject_reserved,
    require_columns, require_incremental_key, require_merge_keys, require_primary_keys,
    require_temporal_key, script, time_window, unsupported, SCD2_COLUMNS,
};
use crate::error::MaterializeResult;
use crate::registry::{BuildContext, MaterializedSql, Registry, TEMP_TABLE_PREFIX};
use matc_core::sql_utils::{backtick, double_quoted_literal};
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
        .with(T::Table, S::TruncateInsert, build_truncate_insert)
        .with(T::Table, S::Merge, build_merge)
        .with(T::Table, S::TimeInterval, build_time_interval)
        .with(T::Table, S::Ddl, build_ddl)
        .with(T::Table, S::Scd2ByColumn, build_scd2_by_column)
        .with(T::Table, S::Scd2ByTime, build_scd2_by_time)
}

fn build_create_replace(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    match asset.materialization.strategy {
        S::Scd2ByTime => scd2_by_time_full_refresh(asset, query),
        S::Scd2ByColumn => scd2_by_column_full_refresh(asset, query),
        _ => {
            let mat = &asset.materialization;
            let mut head = vec![format!("CREATE OR REPLACE TABLE {}", asset.name)];
            if let Some(partition) = mat.partition_by() {
                head.push(format!("PARTITION BY {partition}"));
            }
            if !mat.cluster_by.is_empty() {
                head.push(format!("CLUSTER BY {}", mat.cluster_by.join(", ")));
            }
            Ok(format!("{} AS\n{}", head.join(" "), query).into())
        }
    }
}

fn build_truncate_insert(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    Ok(format!(
        "TRUNCATE TABLE {name};\nINSERT INTO {name} {query}",
        name = asset.name
    )
    .into())
}

/// Known key types stage the distinct keys in an `ARRAY` variable
fn build_delete_insert(
    asset: &Asset,
    query: &str,
    ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let key = require_incremental_key(asset, S::DeleteInsert)?;
    let tmp = ctx.temp_table(TEMP_TABLE_PREFIX);
    let name = &asset.name;

    let key_type = asset
        .column(key)
        .map(|c| c.data_type.trim())
        .filter(|t| !t.is_empty() && *t != "UNKNOWN");

    let statements = match key_type {
        Some(key_type) => {
            let var = format!("distinct_keys_{}", ctx.suffix());
            vec![
                format!("DECLARE {var} array<{key_type}>"),
                "BEGIN TRANSACTION".to_string(),
                format!("CREATE TEMP TABLE {tmp} AS {query}"),
                format!("SET {var} = (SELECT array_agg(distinct {key}) FROM {tmp})"),
                format!("DELETE FROM {name} WHERE {key} in unnest({var})"),
                format!("INSERT INTO {name} SELECT * FROM {tmp}"),
                "COMMIT TRANSACTION".to_string(),
            ]
        }
        None => vec![
            "BEGIN TRANSACTION".to_string(),
            format!("CREATE TEMP TABLE {tmp} AS {query}"),
            format!("DELETE FROM {name} WHERE {key} in (SELECT DISTINCT {key} FROM {tmp})"),
            format!("INSERT INTO {name} SELECT * FROM {tmp}"),
            "COMMIT TRANSACTION".to_string(),
        ],
    };
    Ok(script(&statements).into())
}

fn build_merge(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let keys = require_merge_keys(asset)?;
    let columns = asset.column_names().join(", ");

    let mut lines = vec![
        format!("MERGE {} target", asset.name),
        format!("USING ({query}) source"),
        format!("ON ({})", null_safe_equalities(&keys, "source", "target")),
    ];
    let updates = merge_assignments(asset, "target.", str::to_string);
    if !updates.is_empty() {
        lines.push(format!("WHEN MATCHED THEN UPDATE SET {}", updates.join(", ")));
    }
    lines.push(format!(
        "WHEN NOT MATCHED THEN INSERT({columns}) VALUES({columns})"
    ));

    Ok(format!("{};", lines.join("\n")).into())
}

fn build_time_interval(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let (key, start, end) = time_window(asset)?;
    let name = &asset.name;

    Ok(script(&[
        "BEGIN TRANSACTION".to_string(),
        format!("DELETE FROM {name} WHERE {key} BETWEEN '{start}' AND '{end}'"),
        format!("INSERT INTO {name} {query}"),
        "COMMIT TRANSACTION".to_string(),
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
                    " OPTIONS(description={})",
                    double_quoted_literal(&col.description)
                ));
            }
            definition
        })
        .collect();
    let primary_keys = asset.primary_keys();
    if !primary_keys.is_empty() {
        definitions.push(format!(
            "PRIMARY KEY ({}) NOT ENFORCED",
            primary_keys.join(", ")
        ));
    }

    let mat = &asset.materialization;
    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        asset.name,
        definitions.join(",\n  ")
    );
    if let Some(partition) = mat.partition_by() {
        sql.push_str(&format!("\nPARTITION BY {partition}"));
    }
    if !mat.cluster_by.is_empty() {
        sql.push_str(&format!("\nCLUSTER BY {}", mat.cluster_by.join(", ")));
    }
    Ok(sql.into())
}

/// Partition and cluster clauses of an SCD2 table, defaulting to
/// `DATE(_valid_from)` and `_is_current` plus the primary keys
fn scd2_layout(asset: &Asset, primary_keys: &[&str]) -> (String, String) {
    let mat = &asset.materialization;
    let partition = match mat.partition_by() {
        Some(partition) => format!("PARTITION BY {partition}"),
        None => "PARTITION BY DATE(_valid_from)".to_string(),
    };
    let cluster = if mat.cluster_by.is_empty() {
        format!("CLUSTER BY _is_current, {}", primary_keys.join(", "))
    } else {
        format!("CLUSTER BY {}", mat.cluster_by.join(", "))
    };
    (partition, cluster)
}

fn scd2_by_column_full_refresh(asset: &Asset, query: &str) -> MaterializeResult<MaterializedSql> {
    let primary_keys = require_primary_keys(asset, S::Scd2ByColumn)?;
    let (partition, cluster) = scd2_layout(asset, &primary_keys);

    Ok(format!(
        "CREATE OR REPLACE TABLE {table}
{partition}
{cluster} AS
SELECT
  CURRENT_TIMESTAMP() AS _valid_from,
  src.*,
  TIMESTAMP('9999-12-31') AS _valid_until,
  TRUE                    AS _is_current
FROM (
{query}
) AS src;",
        table = backtick(&asset.name),
    )
    .into())
}

fn scd2_by_time_full_refresh(asset: &Asset, query: &str) -> MaterializeResult<MaterializedSql> {
    let key = require_incremental_key(asset, S::Scd2ByTime)?;
    let primary_keys = require_primary_keys(asset, S::Scd2ByTime)?;
    let (partition, cluster) = scd2_layout(asset, &primary_keys);

    Ok(format!(
        "CREATE OR REPLACE TABLE {table}
{partition}
{cluster} AS
SELECT
  CAST ({key} AS TIMESTAMP) AS _valid_from,
  src.*,
  TIMESTAMP('9999-12-31') AS _valid_until,
  TRUE AS _is_current
FROM (
{query}
) AS src;",
        table = backtick(&asset.name),
    )
    .into())
}

fn build_scd2_by_column(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    reject_reserved(asset, &SCD2_COLUMNS)?;
    let primary_keys = require_primary_keys(asset, S::Scd2ByColumn)?;

    let non_keys: Vec<&str> = asset
        .columns
        .iter()
        .filter(|c| !c.primary_key)
        .map(|c| c.name.as_str())
        .collect();
    let changed = |left: &str, right: &str| {
        if non_keys.is_empty() {
            return "FALSE".to_string();
        }
        non_keys
            .iter()
            .map(|c| format!("{left}.{c} != {right}.{c}"))
            .collect::<Vec<_>>()
            .join(" OR ")
    };
    let on = primary_keys
        .iter()
        .map(|k| format!("target.{k} = source.{k}"))
        .collect::<Vec<_>>()
        .join(" AND ");
    let (insert_columns, insert_values) =
        insert_lists(asset, ["CURRENT_TIMESTAMP()".to_string(), "TIMESTAMP('9999-12-31')".to_string()]);

    Ok(format!(
        "MERGE INTO {table} AS target
USING (
  WITH s1 AS (
    {query}
  )
  SELECT *, TRUE AS _is_current
  FROM   s1
  UNION ALL
  SELECT s1.*, FALSE AS _is_current
  FROM   s1
  JOIN   {table} AS t1 USING ({pk_list})
  WHERE  ({where_changed}) AND t1._is_current
) AS source
ON  {on} AND target._is_current AND source._is_current

WHEN MATCHED AND (
    {matched_changed}
) THEN
  UPDATE SET
    target._valid_until = CURRENT_TIMESTAMP(),
    target._is_current  = FALSE

WHEN NOT MATCHED BY SOURCE AND target._is_current = TRUE THEN
  UPDATE SET
    target._valid_until = CURRENT_TIMESTAMP(),
    target._is_current  = FALSE

WHEN NOT MATCHED BY TARGET THEN
  INSERT ({insert_columns})
  VALUES ({insert_values});",
        table = backtick(&asset.name),
        pk_list = primary_keys.join(", "),
        where_changed = changed("t1", "s1"),
        matched_changed = changed("target", "source"),
    )
    .into())
}

fn build_scd2_by_time(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let key = require_incremental_key(asset, S::Scd2ByTime)?;
    reject_reserved(asset, &SCD2_COLUMNS)?;
    require_temporal_key(asset, key)?;
    let primary_keys = require_primary_keys(asset, S::Scd2ByTime)?;

    let on = primary_keys
        .iter()
        .map(|k| format!("target.{k} = source.{k}"))
        .collect::<Vec<_>>()
        .join(" AND ");
    let (insert_columns, insert_values) = insert_lists(
        asset,
        [
            format!("CAST(source.{key} AS TIMESTAMP)"),
            "TIMESTAMP('9999-12-31')".to_string(),
        ],
    );

    Ok(format!(
        "MERGE INTO {table} AS target
USING (
  WITH s1 AS (
    {query}
  )
  SELECT s1.*, TRUE AS _is_current
  FROM   s1
  UNION ALL
  SELECT s1.*, FALSE AS _is_current
  FROM s1
  JOIN   {table} AS t1 USING ({pk_list})
  WHERE  t1._valid_from < CAST (s1.{key} AS TIMESTAMP) AND t1._is_current
) AS source
ON  {on} AND target._is_current AND source._is_current

WHEN MATCHED AND (
  target._valid_from < CAST (source.{key} AS TIMESTAMP)
) THEN
  UPDATE SET
    target._valid_until = CAST (source.{key} AS TIMESTAMP),
    target._is_current  = FALSE

WHEN NOT MATCHED BY SOURCE AND target._is_current = TRUE THEN
  UPDATE SET
    target._valid_until = CURRENT_TIMESTAMP(),
    target._is_current  = FALSE

WHEN NOT MATCHED BY TARGET THEN
  INSERT ({insert_columns})
  VALUES ({insert_values});",
        table = backtick(&asset.name),
        pk_list = primary_keys.join(", "),
    )
    .into())
}

/// Column list and `source.`-prefixed values, closed by the SCD2 bookkeeping
/// columns; `bounds` supplies `_valid_from` and `_valid_until`
fn insert_lists(asset: &Asset, bounds: [String; 2]) -> (String, String) {
    let mut columns: Vec<String> = asset.columns.iter().map(|c| c.name.clone()).collect();
    let mut values: Vec<String> = columns.iter().map(|c| format!("source.{c}")).collect();
    columns.extend(SCD2_COLUMNS.iter().map(|c| c.to_string()));
    values.extend(bounds);
    values.push("TRUE".to_string());
    (columns.join(", "), values.join(", "))
}

#[cfg(test)]
#[path = "bigquery_test.rs"]
mod tests;
