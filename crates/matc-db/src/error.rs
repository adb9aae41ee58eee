//! Error types for matc-db

use thiserror::Error;

/// Connection, sensor and check errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] SQL execution failed: {0}")]
    ExecutionError(String),

    /// Mutex poisoned (D003)
    #[error("[D003] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// No connection registered under the name (D004)
    #[error("[D004] connection '{name}' does not exist")]
    ConnectionNotFound { name: String },

    /// `CREATE SCHEMA IF NOT EXISTS` failed (D005)
    #[error("[D005] failed to create or ensure database: {schema}: {source}")]
    SchemaCreation {
        schema: String,
        #[source]
        source: Box<DbError>,
    },

    /// A count query did not return a single integer-like cell (D006)
    #[error("[D006] {0}")]
    UnexpectedResult(String),

    /// Sensor deadline reached (D007)
    #[error("[D007] Sensor timed out after 24 hours")]
    SensorTimeout,

    /// Sensor in `once` mode saw a non-positive result (D008)
    #[error("[D008] Sensor didn't return the expected result")]
    SensorUnmet,

    /// Table name shape not usable for an existence check (D009)
    #[error("[D009] table name must be in {expected} format, '{name}' given")]
    InvalidTableName { name: String, expected: String },

    /// Column check found offending rows (D010)
    #[error("[D010] {message}")]
    CheckFailed { check: String, message: String },

    /// Internal error (D011)
    #[error("[D011] Internal database error: {0}")]
    Internal(String),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        DbError::ExecutionError(err.to_string())
    }
}
