//! Sensors: poll a connection until a query reports a positive count or a
//! table appears.

use crate::error::{DbError, DbResult};
use crate::result::cast_result_to_integer;
use crate::traits::{connection_for_asset, Connection, ConnectionGetter, Pipeline};
use matc_core::sql_utils::escape_sql_string;
use matc_core::{Asset, Dialect, Query};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Hard upper bound for a waiting sensor
pub const SENSOR_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Default seconds between pokes
pub const DEFAULT_POKE_INTERVAL: u64 = 30;

/// How a sensor reacts to a miss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorMode {
    /// Do not poke at all
    Skip,
    /// Poke a single time and fail on a miss
    #[default]
    Once,
    /// Keep poking until success or the deadline
    Wait,
}

impl SensorMode {
    /// `skip` and `once` are recognized, an empty mode means `once`, and
    /// anything else waits.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "skip" => SensorMode::Skip,
            "" | "once" => SensorMode::Once,
            _ => SensorMode::Wait,
        }
    }
}

/// Parameters shared by every sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorOptions {
    pub mode: SensorMode,
    pub poke_interval: Duration,
}

impl Default for SensorOptions {
    fn default() -> Self {
        Self {
            mode: SensorMode::default(),
            poke_interval: Duration::from_secs(DEFAULT_POKE_INTERVAL),
        }
    }
}

impl SensorOptions {
    pub fn new(mode: SensorMode, poke_interval: Duration) -> Self {
        Self {
            mode,
            poke_interval,
        }
    }

    /// Read `mode` and `poke_interval` from string parameters.
    ///
    /// An unparsable or zero interval falls back to the default.
    pub fn from_parameters(params: &HashMap<String, String>) -> Self {
        let mode = params
            .get("mode")
            .map(|m| SensorMode::parse(m))
            .unwrap_or_default();
        let secs = params
            .get("poke_interval")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_POKE_INTERVAL);
        Self::new(mode, Duration::from_secs(secs))
    }
}

/// Poke until `check` reports true, honoring the mode and the deadline
async fn poll<F, Fut>(options: SensorOptions, mut check: F) -> DbResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DbResult<bool>>,
{
    if options.mode == SensorMode::Skip {
        log::info!("Sensor mode is 'skip', not poking");
        return Ok(());
    }

    let deadline = tokio::time::sleep_until(Instant::now() + SENSOR_TIMEOUT);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            biased;
            _ = &mut deadline => return Err(DbError::SensorTimeout),
            found = check() => {
                if found? {
                    return Ok(());
                }
            }
        }

        if options.mode == SensorMode::Once {
            return Err(DbError::SensorUnmet);
        }

        log::info!(
            "Sensor didn't return the expected result, waiting for {} seconds",
            options.poke_interval.as_secs()
        );
        tokio::select! {
            biased;
            _ = &mut deadline => return Err(DbError::SensorTimeout),
            _ = tokio::time::sleep(options.poke_interval) => {}
        }
    }
}

async fn count_is_positive(conn: &dyn Connection, query: &Query) -> DbResult<bool> {
    let rows = conn.select(query).await?;
    Ok(cast_result_to_integer(&rows)? > 0)
}

/// Waits for a query to return a positive count
pub struct QuerySensor {
    connections: Arc<dyn ConnectionGetter>,
    options: SensorOptions,
}

impl QuerySensor {
    pub fn new(connections: Arc<dyn ConnectionGetter>, options: SensorOptions) -> Self {
        Self {
            connections,
            options,
        }
    }

    /// Poke `query` on the asset's connection
    pub async fn run(&self, pipeline: &dyn Pipeline, asset: &Asset, query: &Query) -> DbResult<()> {
        let conn = connection_for_asset(self.connections.as_ref(), pipeline, asset)?;
        let conn = conn.as_ref();
        poll(self.options, move || async move {
            log::info!("Poking: {}", query.query);
            count_is_positive(conn, query).await
        })
        .await
    }
}

/// Waits for a table to exist
pub struct TableSensor {
    connections: Arc<dyn ConnectionGetter>,
    dialect: Dialect,
    options: SensorOptions,
}

impl TableSensor {
    pub fn new(
        connections: Arc<dyn ConnectionGetter>,
        dialect: Dialect,
        options: SensorOptions,
    ) -> Self {
        Self {
            connections,
            dialect,
            options,
        }
    }

    /// Poke for `table` on the asset's connection.
    ///
    /// Connections with a native existence check use it for `schema.table`
    /// names; everything else goes through a dialect count query.
    pub async fn run(&self, pipeline: &dyn Pipeline, asset: &Asset, table: &str) -> DbResult<()> {
        let conn = connection_for_asset(self.connections.as_ref(), pipeline, asset)?;
        let query = table_exists_query(self.dialect, table)?;
        let native = match table.split('.').collect::<Vec<_>>().as_slice() {
            [schema, name] => Some((schema.to_string(), name.to_string())),
            _ => None,
        };

        let conn = conn.as_ref();
        let query = &query;
        let native = native.as_ref();
        poll(self.options, move || async move {
            log::info!("Poking: {table}");
            match (conn.as_table_exists_checker(), native) {
                (Some(checker), Some((schema, name))) => checker.table_exists(schema, name).await,
                _ => count_is_positive(conn, query).await,
            }
        })
        .await
    }
}

/// Split `table` into its qualifiers and bare name.
///
/// At most `max_qualifiers` qualifiers are accepted and no part may be empty.
fn split_table<'a>(
    table: &'a str,
    max_qualifiers: usize,
    expected: &str,
) -> DbResult<(Vec<&'a str>, &'a str)> {
    let invalid = || DbError::InvalidTableName {
        name: table.to_string(),
        expected: expected.to_string(),
    };
    let parts: Vec<&str> = table.split('.').map(str::trim).collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(invalid());
    }
    match parts.split_last() {
        Some((name, qualifiers)) if qualifiers.len() <= max_qualifiers => {
            Ok((qualifiers.to_vec(), *name))
        }
        _ => Err(invalid()),
    }
}

fn quoted(value: &str) -> String {
    format!("'{}'", escape_sql_string(value))
}

/// Count query that returns a positive number when `table` exists
pub fn table_exists_query(dialect: Dialect, table: &str) -> DbResult<Query> {
    let sql = match dialect {
        Dialect::BigQuery => {
            let (qualifiers, name) =
                split_table(table, 2, "dataset.table or project.dataset.table")?;
            if qualifiers.is_empty() {
                return Err(DbError::InvalidTableName {
                    name: table.to_string(),
                    expected: "dataset.table or project.dataset.table".to_string(),
                });
            }
            format!(
                "SELECT COUNT(*) FROM `{}.INFORMATION_SCHEMA.TABLES` WHERE table_name = {}",
                qualifiers.join("."),
                quoted(name)
            )
        }
        Dialect::Redshift => {
            let (qualifiers, name) = split_table(table, 1, "table or schema.table")?;
            let schema = qualifiers.first().copied().unwrap_or("public");
            format!(
                "SELECT COUNT(*) FROM SVV_TABLES WHERE table_schema = {} AND table_name = {}",
                quoted(schema),
                quoted(name)
            )
        }
        Dialect::Postgres | Dialect::DuckDb | Dialect::MySql => {
            let (qualifiers, name) = split_table(table, 1, "table or schema.table")?;
            let schema = match (qualifiers.first(), dialect) {
                (Some(schema), _) => quoted(schema),
                (None, Dialect::DuckDb) => quoted("main"),
                (None, Dialect::MySql) => "DATABASE()".to_string(),
                (None, _) => quoted("public"),
            };
            format!(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = {schema} AND table_name = {}",
                quoted(name)
            )
        }
        Dialect::ClickHouse => {
            let (qualifiers, name) = split_table(table, 1, "table or database.table")?;
            let database = qualifiers
                .first()
                .map(|d| quoted(d))
                .unwrap_or_else(|| "currentDatabase()".to_string());
            format!(
                "SELECT COUNT(*) FROM system.tables WHERE database = {database} AND name = {}",
                quoted(name)
            )
        }
        Dialect::Oracle => {
            let (qualifiers, name) = split_table(table, 1, "table or owner.table")?;
            match qualifiers.first() {
                None => format!(
                    "SELECT COUNT(*) FROM USER_TABLES WHERE TABLE_NAME = UPPER({})",
                    quoted(name)
                ),
                Some(owner) => format!(
                    "SELECT COUNT(*) FROM ALL_TABLES WHERE OWNER = UPPER({}) AND TABLE_NAME = UPPER({})",
                    quoted(owner),
                    quoted(name)
                ),
            }
        }
    };
    Ok(Query::new(sql))
}

#[cfg(test)]
#[path = "sensor_test.rs"]
mod tests;
