//! Error types for matc-sql

use thiserror::Error;

/// SQL parsing and extraction errors
#[derive(Error, Debug)]
pub enum SqlError {
    /// SQL parse error (S001)
    #[error("[S001] SQL parse error at line {line}, column {column}: {message}")]
    ParseError {
        message: String,
        line: usize,
        column: usize,
    },

    /// Unknown parser dialect (S002)
    #[error("[S002] Unknown SQL dialect: {0}")]
    UnknownDialect(String),

    /// Template rendering failed while extracting (S003)
    #[error("[S003] could not render file while extracting the queries from the file: {source}")]
    RenderError {
        #[from]
        source: matc_jinja::JinjaError,
    },

    /// Source file could not be read (S004)
    #[error("[S004] could not read file '{path}': {source}")]
    ReadError {
        path: String,
        source: std::io::Error,
    },
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;
