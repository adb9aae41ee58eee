//! Parser dialect lookup and parsing with located errors

use sqlparser::ast::Statement;
use sqlparser::dialect::{dialect_from_str, Dialect};
use sqlparser::parser::Parser;

use crate::error::{SqlError, SqlResult};

/// Resolve a parser dialect by name (`postgres`, `bigquery`, `duckdb`, ...)
pub fn parser_dialect(name: &str) -> SqlResult<Box<dyn Dialect>> {
    dialect_from_str(name).ok_or_else(|| SqlError::UnknownDialect(name.to_string()))
}

/// Parse SQL into AST statements using the named dialect
pub fn parse_sql(sql: &str, dialect: &str) -> SqlResult<Vec<Statement>> {
    let dialect = parser_dialect(dialect)?;
    Parser::parse_sql(dialect.as_ref(), sql).map_err(|e| {
        let msg = e.to_string();
        let (line, column) = parse_location_from_error(&msg);
        SqlError::ParseError {
            message: msg,
            line,
            column,
        }
    })
}

/// Pull "Line: N, Column: M" out of a sqlparser error message; `(0, 0)`
/// when either number is missing.
fn parse_location_from_error(msg: &str) -> (usize, usize) {
    match (number_after(msg, "Line: "), number_after(msg, "Column: ")) {
        (Some(line), Some(column)) => (line, column),
        _ => (0, 0),
    }
}

fn number_after(msg: &str, label: &str) -> Option<usize> {
    let rest = &msg[msg.find(label)? + label.len()..];
    let digits = rest
        .find(|c: char| !c.is_ascii_digit())
        .map_or(rest, |end| &rest[..end]);
    digits.parse().ok()
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
