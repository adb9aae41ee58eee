//! Column quality checks
//!
//! Every check counts offending rows and passes when the count is zero.

use crate::error::{DbError, DbResult};
use crate::result::cast_result_to_integer;
use crate::traits::{connection_for_asset, ConnectionGetter, Pipeline};
use matc_core::sql_utils::escape_sql_string;
use matc_core::{Asset, Column, Query};
use std::fmt;
use std::sync::Arc;

/// Threshold for `min`/`max` checks
#[derive(Debug, Clone, PartialEq)]
pub enum CheckValue {
    Int(i64),
    Float(f64),
    String(String),
}

impl CheckValue {
    fn to_sql(&self) -> String {
        match self {
            CheckValue::Int(i) => i.to_string(),
            CheckValue::Float(f) => format!("{f:.6}"),
            CheckValue::String(s) => format!("'{}'", escape_sql_string(s)),
        }
    }
}

impl fmt::Display for CheckValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckValue::Int(i) => write!(f, "{i}"),
            CheckValue::Float(v) => write!(f, "{v}"),
            CheckValue::String(s) => write!(f, "{s}"),
        }
    }
}

/// Built-in column checks
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnCheck {
    NotNull,
    Unique,
    Positive,
    NonNegative,
    Negative,
    Min(CheckValue),
    Max(CheckValue),
}

impl ColumnCheck {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnCheck::NotNull => "not_null",
            ColumnCheck::Unique => "unique",
            ColumnCheck::Positive => "positive",
            ColumnCheck::NonNegative => "non_negative",
            ColumnCheck::Negative => "negative",
            ColumnCheck::Min(_) => "min",
            ColumnCheck::Max(_) => "max",
        }
    }

    /// Query counting the rows of `table` that violate the check on `column`
    pub fn query(&self, table: &str, column: &str) -> Query {
        let count_where = |condition: String| {
            format!("SELECT count(*) FROM {table} WHERE {column} {condition}")
        };
        let sql = match self {
            ColumnCheck::NotNull => count_where("IS NULL".to_string()),
            ColumnCheck::Unique => {
                format!("SELECT COUNT({column}) - COUNT(DISTINCT {column}) FROM {table}")
            }
            ColumnCheck::Positive => count_where("<= 0".to_string()),
            ColumnCheck::NonNegative => count_where("< 0".to_string()),
            ColumnCheck::Negative => count_where(">= 0".to_string()),
            ColumnCheck::Min(v) => count_where(format!("< {}", v.to_sql())),
            ColumnCheck::Max(v) => count_where(format!("> {}", v.to_sql())),
        };
        Query::new(sql)
    }

    /// Failure message for `count` offending rows
    pub fn failure_message(&self, column: &str, count: i64) -> String {
        let what = match self {
            ColumnCheck::NotNull => "null values".to_string(),
            ColumnCheck::Unique => "non-unique values".to_string(),
            ColumnCheck::Positive => "non-positive values".to_string(),
            ColumnCheck::NonNegative => "negative values".to_string(),
            ColumnCheck::Negative => "non-negative values".to_string(),
            ColumnCheck::Min(v) => format!("values below minimum {v}"),
            ColumnCheck::Max(v) => format!("values above maximum {v}"),
        };
        format!("column '{column}' has {count} {what}")
    }
}

/// Runs column checks against the asset's connection
pub struct ColumnCheckRunner {
    connections: Arc<dyn ConnectionGetter>,
}

impl ColumnCheckRunner {
    pub fn new(connections: Arc<dyn ConnectionGetter>) -> Self {
        Self { connections }
    }

    pub async fn run(
        &self,
        pipeline: &dyn Pipeline,
        asset: &Asset,
        column: &Column,
        check: &ColumnCheck,
    ) -> DbResult<()> {
        let conn = connection_for_asset(self.connections.as_ref(), pipeline, asset)?;
        let query = check.query(&asset.name, &column.name);
        log::debug!("running {} check on {}.{}", check.name(), asset.name, column.name);

        let count = cast_result_to_integer(&conn.select(&query).await?)?;
        if count != 0 {
            return Err(DbError::CheckFailed {
                check: check.name().to_string(),
                message: check.failure_message(&column.name, count),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "checks_test.rs"]
mod tests;
