//! Error types for matc-materialize

use matc_core::{MaterializationStrategy, MaterializationType};
use thiserror::Error;

/// Materialization errors
#[derive(Error, Debug)]
pub enum MaterializeError {
    /// M001: No builder registered for the pair
    #[error("[M001] unsupported materialization type - strategy combination: (`{kind}` - `{strategy}`)")]
    UnsupportedCombination {
        kind: MaterializationType,
        strategy: MaterializationStrategy,
    },

    /// M002: The pair is registered but rejected for this dialect
    #[error("[M002] materialization strategy {strategy} is not supported for materialization type {kind} and asset type {asset_type}")]
    UnsupportedStrategy {
        strategy: MaterializationStrategy,
        kind: MaterializationType,
        asset_type: String,
    },

    /// M003: Strategy needs an incremental key
    #[error("[M003] materialization strategy {strategy} requires the `incremental_key` field to be set")]
    MissingIncrementalKey { strategy: MaterializationStrategy },

    /// M004: Strategy needs at least one primary key column
    #[error("[M004] materialization strategy {strategy} requires the `primary_key` field to be set on at least one column")]
    MissingPrimaryKey { strategy: MaterializationStrategy },

    /// M005: Strategy needs declared columns
    #[error("[M005] materialization strategy {strategy} requires the `columns` field to be set")]
    MissingColumns { strategy: MaterializationStrategy },

    /// M006: Column collides with an SCD2 bookkeeping column
    #[error("[M006] column name {column} is reserved for SCD-2 and cannot be used")]
    ReservedColumn { column: String },

    /// M007: Identifier would be unsafe to interpolate
    #[error("[M007] invalid {kind}: \"{name}\" contains unsupported characters")]
    InvalidIdentifier { kind: String, name: String },

    /// M008: time_interval without a granularity
    #[error("[M008] time_granularity is required for time_interval strategy")]
    MissingTimeGranularity,

    /// M009: Any other invalid asset definition
    #[error("[M009] {message}")]
    Invalid { message: String },
}

impl MaterializeError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        MaterializeError::Invalid {
            message: message.into(),
        }
    }
}

/// Result type alias for MaterializeError
pub type MaterializeResult<T> = Result<T, MaterializeError>;
