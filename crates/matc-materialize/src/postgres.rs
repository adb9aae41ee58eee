//! Postgres strategies, shared with Redshift through [`Flavor::Redshift`].
//!
//! Column identifiers are double-quoted; the asset name is emitted as given.

use crate::ansi::{
    build_append, build_truncate_insert, build_view, key_equalities, merge_assignments,
    reject_reserved, require_columns, require_incremental_key, require_merge_keys,
    require_primary_keys, require_temporal_key, script, time_window, unsupported, SCD2_COLUMNS,
};
use crate::error::MaterializeResult;
use crate::registry::{
    BuildContext, Flavor, MaterializedSql, Registry, SCD2_TEMP_PREFIX, SCD2_TIME_TEMP_PREFIX,
    TEMP_TABLE_PREFIX,
};
use matc_core::sql_utils::{escape_sql_string, quote_qualified};
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

fn valid_until(flavor: Flavor) -> &'static str {
    match flavor {
        Flavor::Standard => "'9999-12-31 00:00:00'::TIMESTAMP",
        Flavor::Redshift => "TIMESTAMP '9999-12-31 00:00:00'",
    }
}

fn build_create_replace(
    asset: &Asset,
    query: &str,
    ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    match asset.materialization.strategy {
        S::Scd2ByTime => scd2_by_time_full_refresh(asset, query, ctx),
        S::Scd2ByColumn => scd2_by_column_full_refresh(asset, query, ctx),
        _ => Ok(format!(
            "BEGIN TRANSACTION;\nDROP TABLE IF EXISTS {name};\nCREATE TABLE {name} AS {query};\nCOMMIT;",
            name = asset.name
        )
        .into()),
    }
}

fn build_delete_insert(
    asset: &Asset,
    query: &str,
    ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let key = quote_qualified(require_incremental_key(asset, S::DeleteInsert)?);
    let tmp = ctx.temp_table(TEMP_TABLE_PREFIX);
    let name = &asset.name;

    Ok(script(&[
        "BEGIN TRANSACTION".to_string(),
        format!("CREATE TEMP TABLE {tmp} AS {query}\n"),
        format!("DELETE FROM {name} WHERE {key} in (SELECT DISTINCT {key} FROM {tmp})"),
        format!("INSERT INTO {name} SELECT * FROM {tmp}"),
        format!("DROP TABLE IF EXISTS {tmp}"),
        "COMMIT".to_string(),
    ])
    .into())
}

fn build_merge(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let keys: Vec<String> = require_merge_keys(asset)?
        .into_iter()
        .map(quote_qualified)
        .collect();
    let columns = asset
        .column_names()
        .into_iter()
        .map(quote_qualified)
        .collect::<Vec<_>>()
        .join(", ");

    let mut lines = vec![
        format!("MERGE INTO {} target", asset.name),
        format!(
            "USING ({}) source ON {}",
            query,
            key_equalities(&keys, "target", "source")
        ),
    ];
    let updates = merge_assignments(asset, "", quote_qualified);
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
        format!(
            "DELETE FROM {name} WHERE {} BETWEEN '{start}' AND '{end}'",
            quote_qualified(key)
        ),
        format!("INSERT INTO {name} {query}"),
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

    let mut definitions = Vec::with_capacity(asset.columns.len() + 1);
    let mut primary_keys = Vec::new();
    let mut comments = Vec::new();
    for col in &asset.columns {
        let quoted = quote_qualified(&col.name);
        let mut definition = format!("{} {}", quoted, col.data_type);
        if !col.nullable {
            definition.push_str(" NOT NULL");
        }
        definitions.push(definition);
        if col.primary_key {
            primary_keys.push(quoted.clone());
        }
        if !col.description.is_empty() {
            comments.push(format!(
                "COMMENT ON COLUMN {}.{} IS '{}';",
                asset.name,
                quoted,
                escape_sql_string(&col.description)
            ));
        }
    }
    if !primary_keys.is_empty() {
        definitions.push(format!("primary key ({})", primary_keys.join(", ")));
    }

    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
        asset.name,
        definitions.join(",\n")
    );
    if !comments.is_empty() {
        sql.push_str(";\n");
        sql.push_str(&comments.join("\n"));
    }
    Ok(sql.into())
}

fn scd2_by_column_full_refresh(
    asset: &Asset,
    query: &str,
    ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    require_primary_keys(asset, S::Scd2ByColumn)?;
    Ok(scd2_full_refresh(asset, query, "CURRENT_TIMESTAMP", ctx.flavor()).into())
}

fn scd2_by_time_full_refresh(
    asset: &Asset,
    query: &str,
    ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let key = require_incremental_key(asset, S::Scd2ByTime)?;
    require_primary_keys(asset, S::Scd2ByTime)?;
    Ok(scd2_full_refresh(asset, query, &quote_qualified(key), ctx.flavor()).into())
}

fn scd2_full_refresh(asset: &Asset, query: &str, valid_from: &str, flavor: Flavor) -> String {
    format!(
        "BEGIN TRANSACTION;
DROP TABLE IF EXISTS {name};
CREATE TABLE {name} AS
SELECT
  {valid_from} AS _valid_from,
  src.*,
  {valid_until} AS _valid_until,
  TRUE AS _is_current
FROM (
{query}
) AS src;
COMMIT;",
        name = asset.name,
        valid_until = valid_until(flavor),
    )
}

/// Quoted primary keys, quoted insert columns and `source.`-prefixed values
struct Scd2Columns {
    primary_keys: Vec<String>,
    insert_columns: Vec<String>,
    insert_values: Vec<String>,
    non_key_columns: Vec<String>,
}

fn scd2_columns(asset: &Asset) -> Scd2Columns {
    let mut columns = Scd2Columns {
        primary_keys: Vec::new(),
        insert_columns: Vec::new(),
        insert_values: Vec::new(),
        non_key_columns: Vec::new(),
    };
    for col in &asset.columns {
        let quoted = quote_qualified(&col.name);
        if col.primary_key {
            columns.primary_keys.push(quoted.clone());
        } else {
            columns.non_key_columns.push(quoted.clone());
        }
        columns.insert_values.push(format!("source.{quoted}"));
        columns.insert_columns.push(quoted);
    }
    columns.insert_columns.extend(SCD2_COLUMNS.iter().map(|c| c.to_string()));
    columns
}

fn build_scd2_by_column(
    asset: &Asset,
    query: &str,
    ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    reject_reserved(asset, &SCD2_COLUMNS)?;
    require_primary_keys(asset, S::Scd2ByColumn)?;

    let mut cols = scd2_columns(asset);
    let on = key_equalities(&cols.primary_keys, "target", "source");

    if ctx.flavor() == Flavor::Redshift {
        return Ok(redshift_scd2_by_column(asset, query, ctx, cols, &on).into());
    }

    cols.insert_values.extend([
        "CURRENT_TIMESTAMP".to_string(),
        valid_until(Flavor::Standard).to_string(),
        "TRUE".to_string(),
    ]);

    let (where_condition, matched_condition) = if cols.non_key_columns.is_empty() {
        ("FALSE AND t1._is_current".to_string(), "FALSE".to_string())
    } else {
        let changed = |left: &str, right: &str| {
            cols.non_key_columns
                .iter()
                .map(|c| format!("{left}.{c} != {right}.{c}"))
                .collect::<Vec<_>>()
                .join(" OR ")
        };
        (
            format!("({}) AND t1._is_current", changed("t1", "s1")),
            changed("target", "source"),
        )
    };

    Ok(format!(
        "MERGE INTO {name} AS target
USING (
  WITH s1 AS (
    {query}
  )
  SELECT *, TRUE AS _is_current
  FROM   s1
  UNION ALL
  SELECT s1.*, FALSE AS _is_current
  FROM   s1
  JOIN   {name} AS t1 USING ({pk_list})
  WHERE  {where_condition}
) AS source
ON  {on} AND target._is_current AND source._is_current

WHEN MATCHED AND (
    {matched_condition}
) THEN
  UPDATE SET
    _valid_until = CURRENT_TIMESTAMP,
    _is_current  = FALSE

WHEN NOT MATCHED BY SOURCE AND target._is_current = TRUE THEN
  UPDATE SET
    _valid_until = CURRENT_TIMESTAMP,
    _is_current  = FALSE

WHEN NOT MATCHED BY TARGET THEN
  INSERT ({insert_columns})
  VALUES ({insert_values});",
        name = asset.name,
        pk_list = cols.primary_keys.join(", "),
        insert_columns = cols.insert_columns.join(", "),
        insert_values = cols.insert_values.join(", "),
    )
    .into())
}

fn build_scd2_by_time(
    asset: &Asset,
    query: &str,
    ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let key = require_incremental_key(asset, S::Scd2ByTime)?;
    reject_reserved(asset, &SCD2_COLUMNS)?;
    require_temporal_key(asset, key)?;
    require_primary_keys(asset, S::Scd2ByTime)?;

    let mut cols = scd2_columns(asset);
    let key = quote_qualified(key);
    let on = key_equalities(&cols.primary_keys, "target", "source");

    if ctx.flavor() == Flavor::Redshift {
        return Ok(redshift_scd2_by_time(asset, query, ctx, cols, &on, &key).into());
    }

    cols.insert_values.extend([
        format!("source.{key}"),
        "'9999-12-31 00:00:00'".to_string(),
        "TRUE".to_string(),
    ]);

    Ok(format!(
        "MERGE INTO {name} AS target
USING (
  WITH s1 AS (
    {query}
  )
  SELECT s1.*, TRUE AS _is_current
  FROM   s1
  UNION ALL
  SELECT s1.*, FALSE AS _is_current
  FROM s1
  JOIN   {name} AS t1 USING ({pk_list})
  WHERE  t1._valid_from < s1.{key} AND t1._is_current
) AS source
ON  {on} AND target._is_current AND source._is_current

WHEN MATCHED AND (
  target._valid_from < source.{key}
) THEN
  UPDATE SET
    _valid_until = source.{key},
    _is_current  = FALSE

WHEN NOT MATCHED BY SOURCE AND target._is_current = TRUE THEN
  UPDATE SET
    _valid_until = CURRENT_TIMESTAMP,
    _is_current  = FALSE

WHEN NOT MATCHED BY TARGET THEN
  INSERT ({insert_columns})
  VALUES ({insert_values});",
        name = asset.name,
        pk_list = cols.primary_keys.join(", "),
        insert_columns = cols.insert_columns.join(", "),
        insert_values = cols.insert_values.join(", "),
    )
    .into())
}

// Redshift MERGE lacks NOT MATCHED BY SOURCE, so SCD2 runs as staged UPDATE/INSERT.

fn redshift_scd2_by_column(
    asset: &Asset,
    query: &str,
    ctx: &BuildContext,
    mut cols: Scd2Columns,
    on: &str,
) -> String {
    let tmp = ctx.temp_table(SCD2_TEMP_PREFIX);
    let now = "(SELECT session_timestamp FROM _ts)";
    cols.insert_values.extend([
        now.to_string(),
        valid_until(Flavor::Redshift).to_string(),
        "TRUE".to_string(),
    ]);
    let matched_condition = if cols.non_key_columns.is_empty() {
        "FALSE".to_string()
    } else {
        cols.non_key_columns
            .iter()
            .map(|c| format!("target.{c} != source.{c}"))
            .collect::<Vec<_>>()
            .join(" OR ")
    };

    format!(
        "BEGIN TRANSACTION;

CREATE TEMP TABLE _ts AS
SELECT CURRENT_TIMESTAMP AS session_timestamp;

CREATE TEMP TABLE {tmp} AS
SELECT *, TRUE AS _is_current FROM ({query}) AS src;

UPDATE {name} AS target
SET _valid_until = {now}, _is_current = FALSE
WHERE target._is_current = TRUE
  AND EXISTS (
    SELECT 1 FROM {tmp} AS source
    WHERE {on} AND ({matched_condition})
  );

UPDATE {name} AS target
SET _valid_until = {now}, _is_current = FALSE
WHERE target._is_current = TRUE
  AND NOT EXISTS (
    SELECT 1 FROM {tmp} AS source
    WHERE {on}
  );

INSERT INTO {name} ({insert_columns})
SELECT {insert_values}
FROM {tmp} AS source
WHERE NOT EXISTS (
  SELECT 1 FROM {name} AS target
  WHERE {on} AND target._is_current = TRUE
);

DROP TABLE {tmp};
COMMIT;",
        name = asset.name,
        insert_columns = cols.insert_columns.join(", "),
        insert_values = cols.insert_values.join(", "),
    )
}

fn redshift_scd2_by_time(
    asset: &Asset,
    query: &str,
    ctx: &BuildContext,
    mut cols: Scd2Columns,
    on: &str,
    key: &str,
) -> String {
    let tmp = ctx.temp_table(SCD2_TIME_TEMP_PREFIX);
    cols.insert_values.extend([
        format!("source.{key}"),
        valid_until(Flavor::Redshift).to_string(),
        "TRUE".to_string(),
    ]);

    format!(
        "BEGIN TRANSACTION;

CREATE TEMP TABLE {tmp} AS
SELECT *, TRUE AS _is_current FROM ({query}) AS src;

UPDATE {name} AS target
SET _valid_until = source.{key}, _is_current = FALSE
FROM {tmp} AS source
WHERE {on}
  AND target._is_current = TRUE
  AND target._valid_from < source.{key};

UPDATE {name} AS target
SET _valid_until = CURRENT_TIMESTAMP, _is_current = FALSE
WHERE target._is_current = TRUE
  AND NOT EXISTS (
    SELECT 1 FROM {tmp} AS source
    WHERE {on}
  );

INSERT INTO {name} ({insert_columns})
SELECT {insert_values}
FROM {tmp} AS source
WHERE NOT EXISTS (
  SELECT 1 FROM {name} AS target
  WHERE {on} AND target._is_current = TRUE
)
OR EXISTS (
  SELECT 1 FROM {name} AS target
  WHERE {on} AND target._is_current = FALSE
  AND target._valid_until = source.{key}
);

DROP TABLE {tmp};
COMMIT;",
        name = asset.name,
        insert_columns = cols.insert_columns.join(", "),
        insert_values = cols.insert_values.join(", "),
    )
}

#[cfg(test)]
#[path = "postgres_test.rs"]
mod tests;
