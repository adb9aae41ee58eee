//! Interpreting single-cell count results

use crate::error::{DbError, DbResult};
use serde_json::Value;

/// Read a `1x1` result as an integer.
///
/// Floats are truncated, booleans map to 1/0, and strings are parsed as an
/// integer, a float, then a boolean.
pub fn cast_result_to_integer(rows: &[Vec<Value>]) -> DbResult<i64> {
    let cell = match rows {
        [row] if row.len() == 1 => &row[0],
        _ => {
            return Err(DbError::UnexpectedResult(format!(
                "multiple results are returned from query, please make sure your query just expects one value - value: {rows:?}"
            )))
        }
    };

    match cell {
        Value::Null => Err(DbError::UnexpectedResult(
            "unexpected result from query, result is nil".to_string(),
        )),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| {
                DbError::UnexpectedResult(format!("number {n} cannot be represented as an integer"))
            }),
        Value::String(s) => parse_string(s).ok_or_else(|| {
            DbError::UnexpectedResult(format!(
                "unexpected result from query, cannot cast result string to integer: {s}"
            ))
        }),
        other => Err(DbError::UnexpectedResult(format!(
            "unexpected result from query, cannot cast result to integer: {other}"
        ))),
    }
}

fn parse_string(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return Some(f as i64);
    }
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Some(1),
        "false" | "f" | "0" => Some(0),
        _ => None,
    }
}

#[cfg(test)]
#[path = "result_test.rs"]
mod tests;
