//! DuckDB strategies.
//!
//! Merge and SCD2 are emulated: merge stages the query in a temp table and
//! runs UPDATE + INSERT, SCD2 rebuilds the table from a CTE pipeline.
//! Expired history rows pass through the rebuild untouched.

use crate::ansi::{
    build_append, build_truncate_insert, build_view, merge_assignments, reject_reserved,
    require_columns, require_incremental_key, require_merge_keys, require_primary_keys,
    require_temporal_key, script, time_window, unsupported, SCD2_COLUMNS,
};
use crate::error::MaterializeResult;
use crate::registry::{BuildContext, MaterializedSql, Registry, MERGE_TEMP_PREFIX, TEMP_TABLE_PREFIX};
use matc_core::sql_utils::escape_sql_string;
use matc_core::{Asset, MaterializationStrategy as S, MaterializationType as T};

const VALID_UNTIL: &str = "TIMESTAMP '9999-12-31 23:59:59'";

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
        S::Scd2ByTime => {
            let key = require_incremental_key(asset, S::Scd2ByTime)?;
            require_primary_keys(asset, S::Scd2ByTime)?;
            Ok(scd2_full_refresh(asset, query, &format!("CAST(src.{key} AS TIMESTAMP)")).into())
        }
        S::Scd2ByColumn => {
            require_primary_keys(asset, S::Scd2ByColumn)?;
            Ok(scd2_full_refresh(asset, query, "CURRENT_TIMESTAMP").into())
        }
        _ => Ok(format!("CREATE OR REPLACE TABLE {} AS\n{}", asset.name, query).into()),
    }
}

fn scd2_full_refresh(asset: &Asset, query: &str, valid_from: &str) -> String {
    let source_columns = asset
        .columns
        .iter()
        .map(|c| format!("src.{}", c.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE OR REPLACE TABLE {name} AS\n\
         SELECT {source_columns},\n\
         {valid_from} AS _valid_from,\n\
         {VALID_UNTIL} AS _valid_until,\n\
         TRUE AS _is_current\n\
         FROM ({query}\n\
         ) AS src;",
        name = asset.name,
    )
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
        "BEGIN TRANSACTION".to_string(),
        format!("CREATE TEMP TABLE {tmp} AS {query}"),
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
    ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    let keys = require_merge_keys(asset)?;
    let tmp = ctx.temp_table(MERGE_TEMP_PREFIX);
    let name = &asset.name;
    let columns = asset.column_names().join(", ");
    let on = keys
        .iter()
        .map(|k| format!("target.{k} = source.{k}"))
        .collect::<Vec<_>>()
        .join(" AND ");

    let mut statements = vec![
        "BEGIN TRANSACTION".to_string(),
        format!("CREATE TEMP TABLE {tmp} AS {query}"),
    ];
    let updates = merge_assignments(asset, "", str::to_string);
    if !updates.is_empty() {
        statements.push(format!(
            "UPDATE {name} AS target SET {} FROM {tmp} AS source WHERE {on}",
            updates.join(", ")
        ));
    }
    statements.extend([
        format!(
            "INSERT INTO {name} ({columns}) SELECT {columns} FROM {tmp} AS source \
             WHERE NOT EXISTS (SELECT 1 FROM {name} AS target WHERE {on})"
        ),
        format!("DROP TABLE {tmp}"),
        "COMMIT".to_string(),
    ]);
    Ok(script(&statements).into())
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
    let mut comments = Vec::new();
    for col in &asset.columns {
        let mut definition = format!("{} {}", col.name, col.data_type);
        if !col.nullable {
            definition.push_str(" NOT NULL");
        }
        definitions.push(definition);
        if !col.description.is_empty() {
            comments.push(format!(
                "COMMENT ON COLUMN {}.{} IS '{}';",
                asset.name,
                col.name,
                escape_sql_string(&col.description)
            ));
        }
    }
    let primary_keys = asset.primary_keys();
    if !primary_keys.is_empty() {
        definitions.push(format!("PRIMARY KEY ({})", primary_keys.join(", ")));
    }

    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        asset.name,
        definitions.join(",\n  ")
    );
    if !comments.is_empty() {
        sql.push_str(";\n");
        sql.push_str(&comments.join("\n"));
    }
    Ok(sql.into())
}

/// How a changed row closes its previous version
struct ChangeRule {
    /// Condition marking an existing current row as superseded
    changed: String,
    /// `_valid_until` of a superseded row
    superseded_until: String,
    /// `_valid_from` of an inserted row
    inserted_from: String,
}

fn build_scd2_by_column(
    asset: &Asset,
    query: &str,
    _ctx: &BuildContext,
) -> MaterializeResult<MaterializedSql> {
    reject_reserved(asset, &SCD2_COLUMNS)?;
    require_primary_keys(asset, S::Scd2ByColumn)?;

    let changed = asset
        .columns
        .iter()
        .filter(|c| !c.primary_key)
        .map(|c| format!("t.{0} != s.{0}", c.name))
        .collect::<Vec<_>>();
    let changed = if changed.is_empty() {
        "FALSE".to_string()
    } else {
        changed.join(" OR ")
    };

    Ok(scd2_rebuild(
        asset,
        query,
        ChangeRule {
            changed,
            superseded_until: "(SELECT now FROM time_now)".to_string(),
            inserted_from: "(SELECT now FROM time_now)".to_string(),
        },
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
    require_primary_keys(asset, S::Scd2ByTime)?;

    let key_ts = format!("CAST(s.{key} AS TIMESTAMP)");
    Ok(scd2_rebuild(
        asset,
        query,
        ChangeRule {
            changed: format!("{key_ts} > t._valid_from"),
            superseded_until: key_ts.clone(),
            inserted_from: key_ts,
        },
    )
    .into())
}

/// Rebuild the table as kept history plus newly current rows
fn scd2_rebuild(asset: &Asset, query: &str, rule: ChangeRule) -> String {
    let name = &asset.name;
    let user_columns = asset.column_names();
    let join = asset
        .primary_keys()
        .iter()
        .map(|k| format!("t.{k} = s.{k}"))
        .collect::<Vec<_>>()
        .join(" AND ");
    let user_list = user_columns.join(", ");
    let all_list = user_columns
        .iter()
        .copied()
        .chain(SCD2_COLUMNS)
        .collect::<Vec<_>>()
        .join(", ");
    let keep_columns = user_columns
        .iter()
        .map(|c| format!("t.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    let insert_columns = user_columns
        .iter()
        .map(|c| format!("s.{c} AS {c}"))
        .collect::<Vec<_>>()
        .join(", ");
    let ChangeRule {
        changed,
        superseded_until,
        inserted_from,
    } = rule;

    [
        format!("CREATE OR REPLACE TABLE {name} AS"),
        "WITH".to_string(),
        "time_now AS (".to_string(),
        "\tSELECT CURRENT_TIMESTAMP AS now".to_string(),
        "),".to_string(),
        "source AS (".to_string(),
        format!("\tSELECT {user_list},"),
        "\tTRUE as _matched_by_source".to_string(),
        format!("\tFROM ({query}"),
        "\t)".to_string(),
        "),".to_string(),
        "target AS (".to_string(),
        format!("\tSELECT {all_list},"),
        format!("\tTRUE as _matched_by_target FROM {name}"),
        "),".to_string(),
        "current_data AS (".to_string(),
        format!("\tSELECT {all_list}, _matched_by_target"),
        "\tFROM target as t".to_string(),
        "\tWHERE _is_current = TRUE".to_string(),
        "),".to_string(),
        "to_keep AS (".to_string(),
        format!("\tSELECT {keep_columns},"),
        "\tt._valid_from,".to_string(),
        "\t\tCASE".to_string(),
        "\t\t\tWHEN t._is_current = FALSE THEN t._valid_until".to_string(),
        format!("\t\t\tWHEN _matched_by_source IS NOT NULL AND ({changed}) THEN {superseded_until}"),
        "\t\t\tWHEN _matched_by_source IS NULL THEN (SELECT now FROM time_now)".to_string(),
        "\t\t\tELSE t._valid_until".to_string(),
        "\t\tEND AS _valid_until,".to_string(),
        "\t\tCASE".to_string(),
        "\t\t\tWHEN t._is_current = FALSE THEN FALSE".to_string(),
        format!("\t\t\tWHEN _matched_by_source IS NOT NULL AND ({changed}) THEN FALSE"),
        "\t\t\tWHEN _matched_by_source IS NULL THEN FALSE".to_string(),
        "\t\t\tELSE t._is_current".to_string(),
        "\t\tEND AS _is_current".to_string(),
        "\tFROM target t".to_string(),
        format!("\tLEFT JOIN source s ON ({join}) AND t._is_current = TRUE"),
        "),".to_string(),
        "to_insert AS (".to_string(),
        format!("\tSELECT {insert_columns},"),
        format!("\t{inserted_from} AS _valid_from,"),
        format!("\t{VALID_UNTIL} AS _valid_until,"),
        "\tTRUE AS _is_current".to_string(),
        "\tFROM source s".to_string(),
        format!("\tLEFT JOIN current_data t ON ({join})"),
        format!("\tWHERE (_matched_by_target IS NULL) OR ({changed})"),
        ")".to_string(),
        format!("SELECT {all_list} FROM to_keep"),
        "UNION ALL".to_string(),
        format!("SELECT {all_list} FROM to_insert;"),
    ]
    .join("\n")
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
