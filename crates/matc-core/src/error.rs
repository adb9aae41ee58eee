//! Error types for matc-core

use thiserror::Error;

/// Core error type for matc
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Invalid configuration value
    #[error("[C002] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C003: Unknown SQL dialect name
    #[error("[C003] Unknown dialect '{name}'")]
    UnknownDialect { name: String },

    /// C004: Query annotations were not a JSON object
    #[error("[C004] invalid JSON in annotations: {annotations}")]
    InvalidAnnotations {
        annotations: String,
        source: serde_json::Error,
    },

    /// C005: IO error with file path context
    #[error("[C005] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// C006: YAML parse error
    #[error("[C006] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
