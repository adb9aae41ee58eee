//! Error types for matc-devenv

use thiserror::Error;

/// Developer-environment rewrite errors
#[derive(Error, Debug)]
pub enum DevEnvError {
    /// Connection cannot summarize its database (E001)
    #[error("[E001] the asset type '{asset_type}' does not support developer environments, please create an issue if you'd like that")]
    Unsupported { asset_type: String },

    /// Connection lookup or summary fetch failed (E002)
    #[error("[E002] {0}")]
    Db(#[from] matc_db::DbError),

    /// Table parsing or renaming failed (E003)
    #[error("[E003] {0}")]
    Sql(#[from] matc_sql::SqlError),

    /// Background parse task did not complete (E004)
    #[error("[E004] table parsing task failed: {0}")]
    TaskFailed(String),
}

/// Result type alias for DevEnvError
pub type DevEnvResult<T> = Result<T, DevEnvError>;
