//! matc-core - Core library for matc
//!
//! This crate provides the shared asset model, the executable query value,
//! warehouse schema snapshots, and configuration parsing used across all matc
//! components.

pub mod asset;
pub mod config;
pub mod database;
pub mod error;
pub mod query;
pub mod sql_utils;

pub use asset::{
    Asset, Column, Materialization, MaterializationStrategy, MaterializationType,
    TimeGranularity,
};
pub use config::{CompilerConfig, DevEnvironment, Dialect, ExtractorKind};
pub use database::{DbColumn, DbDatabase, DbSchema, DbTable};
pub use error::{CoreError, CoreResult};
pub use query::Query;
