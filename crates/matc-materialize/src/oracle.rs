//! Oracle strategies.
//!
//! Oracle before 23c has no `CREATE OR REPLACE TABLE`, and TRUNCATE is DDL,
//! so both run through `EXECUTE IMMEDIATE` inside PL/SQL blocks. Every
//! identifier interpolated into those blocks is validated first.

use crate::ansi::{
    append_sql, merge_assignments, null_safe_equalities, reject_reserved,
    require_incremental_key, require_merge_keys, time_window, unsupported, view_sql,
};
use crate::error::{MaterializeError, MaterializeResult};
use crate::registry::{BuildContext, MaterializedSql, Registry};
use matc_core::sql_utils::escape_sql_string;
use matc_core::{Asset, MaterializationStrategy as S, MaterializationType as T};
use regex::Regex;
use std::sync::OnceLock;

/// Bookkeeping columns of Oracle SCD2 tables
pub const SCD2_COLUMNS: [&str; 3] = ["bruin_valid_from", "bruin_valid_until", "bruin_is_current"];

const VALID_UNTIL: &str = "TO_TIMESTAMP('9999-12-31 23:59:59', 'YYYY-MM-DD HH24:MI:SS')";

static IDENTIFIER_RE: OnceLock<Regex> = OnceLock::new();

fn identifier_re() -> &'static Regex {
    IDENTIFIER_RE.get_or_init(|| Regex::new(r"^[A-Za-z_#$][A-Za-z0-9_#$.]*$").expect("valid regex"))
}

/// Reject names that are not plain, optionally schema-qualified, identifiers
pub fn validate_identifier(name: &str, kind: &str) -> MaterializeResult<()> {
    if identifier_re().is_match(name) {
        Ok(())
    } else {
        Err(MaterializeError::InvalidIdentifier {
            kind: format!("Oracle {kind}"),
            name: name.to_string(),
        })
    }
}

fn table_name(asset: &Asset) -> MaterializeResult<&str> {
    validate_identifier(&asset.name, "table name")?;
    Ok(&asset.name)
}

fn incremental_key(asset: &Asset, strategy: S) -> MaterializeResult<&str> {
    let key = require_incremental_key(asset, strategy)?;
    validate_identifier(key, "incremental_key column")?;
    Ok(key)
}

pub fn registry() -> Registry {
    Registry::new()
        .with(T::View, S::None, build_view)
        .with(T::View, S::CreateReplace, build_view)
        .with(T::View, S::Append, unsupported)
        .with(T::View, S::DeleteInsert, unsupported)
        .with(T::View, S::TruncateInsert, unsupported)
        .with(T::View, S::Merge, unsupported)
        .with(T::Table, S::None, build_create_replace)
        .with(T::Table, S::CreateReplace, build_create_replace)
        .with(T::Table, S::Append, build_append)
        .with(T::Table, S::DeleteInsert, build_delete_insert)
        .with(T::Table, S::TruncateInsert, build_truncate_insert)
        .with(T::Table, S::Merge, build_merge)
        .with(T::Table, S::TimeInterval, build_time_interval)
        .with(T::Table, S::Scd2ByTime, build_scd2_by_time)
}

fn build_view(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    validate_identifier(&asset.name, "view name")?;
    Ok(view_sql(asset, query).into())
}

fn build_append(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    table_name(asset)?;
    Ok(append_sql(asset, query).into())
}

/// Drop (ignoring ORA-00942) then create, both as dynamic SQL
fn replace_block(name: &str, select: &str) -> String {
    let name = escape_sql_string(name);
    let select = escape_sql_string(select);
    format!(
        "BEGIN
   BEGIN
      EXECUTE IMMEDIATE 'DROP TABLE {name} PURGE';
   EXCEPTION
      WHEN OTHERS THEN
         IF SQLCODE != -942 THEN
            RAISE;
         END IF;
   END;
   EXECUTE IMMEDIATE 'CREATE TABLE {name} AS {select}';
END;"
    )
}

fn build_create_replace(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let name = table_name(asset)?;
    if asset.materialization.strategy != S::Scd2ByTime {
        return Ok(replace_block(name, query).into());
    }

    let key = incremental_key(asset, S::Scd2ByTime)?;
    if asset.primary_keys().is_empty() {
        return Err(MaterializeError::MissingPrimaryKey {
            strategy: S::Scd2ByTime,
        });
    }
    let select = format!(
        "SELECT
  src.*,
  CAST(src.{key} AS TIMESTAMP) AS bruin_valid_from,
  {VALID_UNTIL} AS bruin_valid_until,
  1 AS bruin_is_current
FROM (
{query}
) src"
    );
    Ok(replace_block(name, &select).into())
}

fn build_truncate_insert(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let name = table_name(asset)?;
    let escaped = escape_sql_string(name);
    Ok(format!(
        "BEGIN
   EXECUTE IMMEDIATE 'TRUNCATE TABLE {escaped}';
   INSERT INTO {name}
{query}
;
END;"
    )
    .into())
}

fn build_time_interval(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let name = table_name(asset)?;
    incremental_key(asset, S::TimeInterval)?;
    let (key, start, end) = time_window(asset)?;
    Ok(format!(
        "BEGIN
   DELETE FROM {name} WHERE {key} BETWEEN '{start}' AND '{end}';
   INSERT INTO {name}
{query}
;
END;"
    )
    .into())
}

fn build_delete_insert(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let name = table_name(asset)?;
    let key = incremental_key(asset, S::DeleteInsert)?;
    Ok(format!(
        "BEGIN
   DELETE FROM {name} t WHERE EXISTS (
      SELECT 1 FROM ({query}) s WHERE s.{key} = t.{key}
   );
   INSERT INTO {name}
{query}
;
END;"
    )
    .into())
}

fn build_merge(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let name = table_name(asset)?;
    let keys = require_merge_keys(asset)?;
    let columns = asset.column_names();
    let values = columns
        .iter()
        .map(|c| format!("source.{c}"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut lines = vec![
        format!("MERGE INTO {name} target"),
        format!(
            "USING (\n{query}\n) source ON ({})",
            null_safe_equalities(&keys, "target", "source")
        ),
    ];
    let updates = merge_assignments(asset, "target.", str::to_string);
    if !updates.is_empty() {
        lines.push(format!("WHEN MATCHED THEN UPDATE SET {}", updates.join(", ")));
    }
    lines.push(format!(
        "WHEN NOT MATCHED THEN INSERT ({}) VALUES ({values})",
        columns.join(", ")
    ));
    Ok(format!("{};", lines.join("\n")).into())
}

/// Incremental key must be declared with a zone-less TIMESTAMP or DATE type
fn require_oracle_temporal_key(asset: &Asset, key: &str) -> MaterializeResult<()> {
    let Some(col) = asset.columns.iter().find(|c| c.name == key) else {
        return Err(MaterializeError::invalid(format!(
            "incremental_key '{key}' not found in column definitions"
        )));
    };
    let ty = col.data_type.to_lowercase();
    if ty.contains("time zone") {
        return Err(MaterializeError::invalid(
            "TIMESTAMP WITH TIME ZONE is not supported for SCD2_by_time incremental_key; use TIMESTAMP or DATE instead",
        ));
    }
    if !ty.contains("timestamp") && !ty.contains("date") {
        return Err(MaterializeError::invalid(
            "incremental_key must be TIMESTAMP or DATE in SCD2_by_time strategy",
        ));
    }
    Ok(())
}

fn build_scd2_by_time(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let name = table_name(asset)?;
    let key = incremental_key(asset, S::Scd2ByTime)?;
    reject_reserved(asset, &SCD2_COLUMNS)?;
    require_oracle_temporal_key(asset, key)?;
    let keys = asset.primary_keys();
    if keys.is_empty() {
        return Err(MaterializeError::MissingPrimaryKey {
            strategy: S::Scd2ByTime,
        });
    }

    let columns = asset.column_names();
    let insert_columns = columns
        .iter()
        .copied()
        .chain(SCD2_COLUMNS)
        .collect::<Vec<_>>()
        .join(", ");
    let insert_values = columns
        .iter()
        .map(|c| format!("source.{c}"))
        .chain([
            format!("CAST(source.{key} AS TIMESTAMP)"),
            VALID_UNTIL.to_string(),
            "1".to_string(),
        ])
        .collect::<Vec<_>>()
        .join(", ");
    let pk_match = null_safe_equalities(&keys, "target", "source");
    let history_join = null_safe_equalities(&keys, "t1", "s1");
    let on = format!("{pk_match} AND source.bruin_is_current_src = 1");

    // The EXISTS guard keeps an empty batch from expiring every current row
    Ok(format!(
        "BEGIN
UPDATE {name} target
SET bruin_valid_until = LOCALTIMESTAMP, bruin_is_current = 0
WHERE target.bruin_is_current = 1
  AND NOT EXISTS (
    SELECT 1 FROM ({query}) source
    WHERE {pk_match}
  )
  AND EXISTS (SELECT 1 FROM ({query}) source_exists);

MERGE INTO (SELECT * FROM {name} WHERE bruin_is_current = 1) target
USING (
  WITH s1 AS (
    {query}
  )
  SELECT s1.*, 1 AS bruin_is_current_src
  FROM s1
  UNION ALL
  SELECT s1.*, 0 AS bruin_is_current_src
  FROM s1
  JOIN {name} t1 ON ({history_join})
  WHERE t1.bruin_valid_from < CAST(s1.{key} AS TIMESTAMP) AND t1.bruin_is_current = 1
) source
ON ({on})
WHEN MATCHED THEN
  UPDATE SET
    target.bruin_valid_until = CAST(source.{key} AS TIMESTAMP),
    target.bruin_is_current  = 0
  WHERE target.bruin_valid_from < CAST(source.{key} AS TIMESTAMP)
WHEN NOT MATCHED THEN
  INSERT ({insert_columns})
  VALUES ({insert_values});
END;"
    )
    .into())
}

#[cfg(test)]
#[path = "oracle_test.rs"]
mod tests;
