//! Asset definitions: the logical target of a materialization.
//!
//! An [`Asset`] names a warehouse object, describes its columns, and carries
//! the [`Materialization`] that decides which SQL the compiler emits for it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A data asset realized by a materialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Dot-qualified target name, `[project.]dataset.table`
    pub name: String,

    /// Asset type identifier, e.g. `bq.sql` or `pg.sql`
    #[serde(rename = "type", default)]
    pub asset_type: String,

    /// Explicit connection name, overriding the type default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,

    /// Declared columns in order
    #[serde(default)]
    pub columns: Vec<Column>,

    /// How the asset is realized
    #[serde(default)]
    pub materialization: Materialization,
}

fn default_true() -> bool {
    true
}

/// A declared column of an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,

    #[serde(rename = "type", default)]
    pub data_type: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub primary_key: bool,

    #[serde(default)]
    pub update_on_merge: bool,

    /// Custom expression used in `WHEN MATCHED` instead of `source.<name>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_sql: Option<String>,

    #[serde(default = "default_true")]
    pub nullable: bool,
}

impl Column {
    /// Create a plain column with a name and type
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            description: String::new(),
            primary_key: false,
            update_on_merge: false,
            merge_sql: None,
            nullable: true,
        }
    }

    /// Mark the column as part of the primary key
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark the column as updated on merge
    pub fn update_on_merge(mut self) -> Self {
        self.update_on_merge = true;
        self
    }

    pub fn with_merge_sql(mut self, expr: impl Into<String>) -> Self {
        self.merge_sql = Some(expr.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Merge-update expression, `merge_sql` when set
    pub fn merge_expression(&self) -> Option<&str> {
        self.merge_sql.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// Materialization type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MaterializationType {
    /// Run the query as-is
    #[default]
    #[serde(rename = "", alias = "none")]
    None,
    #[serde(rename = "view")]
    View,
    #[serde(rename = "table")]
    Table,
}

impl fmt::Display for MaterializationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaterializationType::None => write!(f, ""),
            MaterializationType::View => write!(f, "view"),
            MaterializationType::Table => write!(f, "table"),
        }
    }
}

/// Algorithm used to populate a materialized asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MaterializationStrategy {
    #[default]
    #[serde(rename = "", alias = "none")]
    None,
    #[serde(rename = "create+replace")]
    CreateReplace,
    #[serde(rename = "delete+insert")]
    DeleteInsert,
    #[serde(rename = "truncate+insert")]
    TruncateInsert,
    #[serde(rename = "append")]
    Append,
    #[serde(rename = "merge")]
    Merge,
    #[serde(rename = "time_interval")]
    TimeInterval,
    #[serde(rename = "ddl")]
    Ddl,
    #[serde(rename = "scd2_by_time")]
    Scd2ByTime,
    #[serde(rename = "scd2_by_column")]
    Scd2ByColumn,
}

impl MaterializationStrategy {
    /// Every strategy, in declaration order
    pub const ALL: [MaterializationStrategy; 10] = [
        MaterializationStrategy::None,
        MaterializationStrategy::CreateReplace,
        MaterializationStrategy::DeleteInsert,
        MaterializationStrategy::TruncateInsert,
        MaterializationStrategy::Append,
        MaterializationStrategy::Merge,
        MaterializationStrategy::TimeInterval,
        MaterializationStrategy::Ddl,
        MaterializationStrategy::Scd2ByTime,
        MaterializationStrategy::Scd2ByColumn,
    ];

    /// Returns true for the SCD2 family
    pub fn is_scd2(self) -> bool {
        matches!(
            self,
            MaterializationStrategy::Scd2ByTime | MaterializationStrategy::Scd2ByColumn
        )
    }
}

impl fmt::Display for MaterializationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MaterializationStrategy::None => "",
            MaterializationStrategy::CreateReplace => "create+replace",
            MaterializationStrategy::DeleteInsert => "delete+insert",
            MaterializationStrategy::TruncateInsert => "truncate+insert",
            MaterializationStrategy::Append => "append",
            MaterializationStrategy::Merge => "merge",
            MaterializationStrategy::TimeInterval => "time_interval",
            MaterializationStrategy::Ddl => "ddl",
            MaterializationStrategy::Scd2ByTime => "scd2_by_time",
            MaterializationStrategy::Scd2ByColumn => "scd2_by_column",
        };
        f.write_str(s)
    }
}

/// Granularity of the `time_interval` window placeholders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeGranularity {
    Date,
    Timestamp,
}

impl TimeGranularity {
    /// The `{{start_X}}` / `{{end_X}}` placeholder pair for this granularity
    pub fn placeholders(self) -> (&'static str, &'static str) {
        match self {
            TimeGranularity::Date => ("{{start_date}}", "{{end_date}}"),
            TimeGranularity::Timestamp => ("{{start_timestamp}}", "{{end_timestamp}}"),
        }
    }
}

impl fmt::Display for TimeGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeGranularity::Date => write!(f, "date"),
            TimeGranularity::Timestamp => write!(f, "timestamp"),
        }
    }
}

/// Materialization settings of an asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Materialization {
    #[serde(rename = "type", default)]
    pub kind: MaterializationType,

    #[serde(default)]
    pub strategy: MaterializationStrategy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_by: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_by: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incremental_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_granularity: Option<TimeGranularity>,
}

impl Materialization {
    /// Table materialization with the given strategy
    pub fn table(strategy: MaterializationStrategy) -> Self {
        Self {
            kind: MaterializationType::Table,
            strategy,
            ..Default::default()
        }
    }

    pub fn view() -> Self {
        Self {
            kind: MaterializationType::View,
            ..Default::default()
        }
    }

    /// Non-blank incremental key
    pub fn incremental_key(&self) -> Option<&str> {
        self.incremental_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Non-blank partition expression
    pub fn partition_by(&self) -> Option<&str> {
        self.partition_by
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

impl Asset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, asset_type: impl Into<String>) -> Self {
        self.asset_type = asset_type.into();
        self
    }

    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_materialization(mut self, materialization: Materialization) -> Self {
        self.materialization = materialization;
        self
    }

    /// Names of all declared columns, in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Names of the primary-key columns, in order
    pub fn primary_keys(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Columns updated in a merge's `WHEN MATCHED` branch
    pub fn merge_columns(&self) -> Vec<&Column> {
        self.columns
            .iter()
            .filter(|c| c.update_on_merge || c.merge_expression().is_some())
            .collect()
    }

    /// Case-insensitive column lookup
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Dot-separated components of the name
    pub fn name_parts(&self) -> Vec<&str> {
        self.name.split('.').collect()
    }

    /// Schema component of the name.
    ///
    /// Part 0 of a two-part name, part 1 of a three-part name, otherwise none.
    pub fn schema_name(&self) -> Option<&str> {
        let parts = self.name_parts();
        match parts.len() {
            2 => Some(parts[0]),
            3 => Some(parts[1]),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "asset_test.rs"]
mod tests;
