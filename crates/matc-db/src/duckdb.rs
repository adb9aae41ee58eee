//! DuckDB connection implementation

use crate::error::{DbError, DbResult};
use crate::traits::{Connection, DatabaseSummarizer, TableExistsChecker};
use async_trait::async_trait;
use duckdb::types::Value as DuckValue;
use matc_core::{DbDatabase, DbSchema, DbTable, Query};
use serde_json::Value;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Schemas hidden from database summaries
const SYSTEM_SCHEMAS: [&str; 2] = ["information_schema", "pg_catalog"];

/// Embedded DuckDB connection
pub struct DuckDbConnection {
    conn: Mutex<duckdb::Connection>,
}

impl DuckDbConnection {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn = duckdb::Connection::open_in_memory()
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn =
            duckdb::Connection::open(path).map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, duckdb::Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    fn execute_script_sync(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))
    }

    fn select_sync(&self, query: &Query) -> DbResult<Vec<Vec<Value>>> {
        let conn = self.lock()?;
        if !query.variable_definitions.is_empty() {
            conn.execute_batch(&query.variable_definitions.join(";\n"))?;
        }

        let mut stmt = conn
            .prepare(&query.query)
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, query.query)))?;
        let mut rows = stmt.query([])?;
        let column_count = rows.as_ref().map(|s| s.column_count()).unwrap_or(0);

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                cells.push(to_json(row.get_ref(idx)?.to_owned()));
            }
            out.push(cells);
        }
        Ok(out)
    }

    fn summary_sync(&self) -> DbResult<DbDatabase> {
        let conn = self.lock()?;
        let name: String = conn.query_row("SELECT current_database()", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(
            "SELECT table_schema, table_name FROM information_schema.tables \
             ORDER BY table_schema, table_name",
        )?;
        let pairs = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut db = DbDatabase::new(name);
        for (schema, table) in pairs {
            if SYSTEM_SCHEMAS.contains(&schema.as_str()) {
                continue;
            }
            match db.schemas.last_mut() {
                Some(last) if last.name == schema => last.tables.push(DbTable {
                    name: table,
                    columns: Vec::new(),
                }),
                _ => db.schemas.push(DbSchema::with_tables(schema, &[table.as_str()])),
            }
        }
        Ok(db)
    }

    fn table_exists_sync(&self, schema: &str, table: &str) -> DbResult<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
            duckdb::params![schema, table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

/// Map a DuckDB cell to JSON; exotic types fall back to their debug text
fn to_json(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(i) => Value::from(i),
        DuckValue::SmallInt(i) => Value::from(i),
        DuckValue::Int(i) => Value::from(i),
        DuckValue::BigInt(i) => Value::from(i),
        DuckValue::HugeInt(i) => Value::String(i.to_string()),
        DuckValue::UTinyInt(i) => Value::from(i),
        DuckValue::USmallInt(i) => Value::from(i),
        DuckValue::UInt(i) => Value::from(i),
        DuckValue::UBigInt(i) => Value::from(i),
        DuckValue::Float(f) => Value::from(f),
        DuckValue::Double(f) => Value::from(f),
        DuckValue::Text(s) => Value::String(s),
        other => Value::String(format!("{other:?}")),
    }
}

#[async_trait]
impl Connection for DuckDbConnection {
    async fn run_query_without_result(&self, query: &Query) -> DbResult<()> {
        log::debug!("duckdb: {}", query.query);
        self.execute_script_sync(&query.to_dry_run_query())
    }

    async fn select(&self, query: &Query) -> DbResult<Vec<Vec<Value>>> {
        log::debug!("duckdb select: {}", query.query);
        self.select_sync(query)
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }

    fn as_database_summarizer(&self) -> Option<&dyn DatabaseSummarizer> {
        Some(self)
    }

    fn as_table_exists_checker(&self) -> Option<&dyn TableExistsChecker> {
        Some(self)
    }
}

#[async_trait]
impl DatabaseSummarizer for DuckDbConnection {
    async fn get_database_summary(&self) -> DbResult<DbDatabase> {
        self.summary_sync()
    }
}

#[async_trait]
impl TableExistsChecker for DuckDbConnection {
    async fn table_exists(&self, schema: &str, table: &str) -> DbResult<bool> {
        self.table_exists_sync(schema, table)
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
