//! matc-materialize - Materialization compiler for matc
//!
//! This crate wraps a rendered query in the DDL/DML that materializes an
//! asset as a view or table. Each dialect contributes an immutable
//! [`Registry`] of strategy builders; [`Materializer`] applies the shared
//! contract (trimming, full-refresh coercion, lookup) and delegates to them.

pub(crate) mod ansi;
pub mod bigquery;
pub mod clickhouse;
pub mod duckdb;
pub mod error;
pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::{MaterializeError, MaterializeResult};
pub use registry::{
    random_suffix, trim_query, BuildContext, Flavor, MaterializedSql, Materializer, Registry,
    StrategyBuilder, TempNameGenerator,
};

use matc_core::Dialect;

/// Materializer for a dialect.
///
/// Redshift shares the Postgres registry with its own SCD2 flavor; ClickHouse
/// batches are joined with a bare `;`.
pub fn materializer_for(dialect: Dialect, full_refresh: bool) -> Materializer {
    match dialect {
        Dialect::BigQuery => Materializer::new(bigquery::registry(), full_refresh),
        Dialect::ClickHouse => {
            Materializer::new(clickhouse::registry(), full_refresh).with_separator(";")
        }
        Dialect::DuckDb => Materializer::new(duckdb::registry(), full_refresh),
        Dialect::MySql => Materializer::new(mysql::registry(), full_refresh),
        Dialect::Oracle => Materializer::new(oracle::registry(), full_refresh),
        Dialect::Postgres => Materializer::new(postgres::registry(), full_refresh),
        Dialect::Redshift => Materializer::new(postgres::registry(), full_refresh)
            .with_flavor(Flavor::Redshift),
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
