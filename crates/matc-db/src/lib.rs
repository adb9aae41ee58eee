//! matc-db - Connection layer for matc
//!
//! This crate provides the async `Connection` trait and its optional
//! capabilities, an embedded DuckDB implementation, plus the operations
//! that run against a connection: schema creation, sensors, and column
//! checks.

pub mod checks;
pub mod duckdb;
pub mod error;
pub mod result;
pub mod schema;
pub mod sensor;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_utils;

pub use checks::{CheckValue, ColumnCheck, ColumnCheckRunner};
pub use duckdb::DuckDbConnection;
pub use error::{DbError, DbResult};
pub use result::cast_result_to_integer;
pub use schema::SchemaCreator;
pub use sensor::{
    table_exists_query, QuerySensor, SensorMode, SensorOptions, TableSensor, SENSOR_TIMEOUT,
};
pub use traits::{
    connection_for_asset, Connection, ConnectionGetter, ConnectionManager, DatabaseSummarizer,
    Pipeline, StaticPipeline, TableExistsChecker,
};
