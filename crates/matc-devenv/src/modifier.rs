//! Schema-prefix rewriting for developer environments
//!
//! When a developer environment with a schema prefix is active, a query that
//! reads `schema.table` is pointed at `prefix+schema.table` whenever that
//! shadow table already exists in the warehouse. Everything else keeps
//! reading production tables.

use crate::error::{DevEnvError, DevEnvResult};
use matc_core::{Asset, DbDatabase, DevEnvironment, Dialect, Query};
use matc_db::{ConnectionGetter, DatabaseSummarizer, DbError, Pipeline};
use matc_sql::{rename_tables, used_tables};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// Parser dialect used to discover table references, independent of the
/// asset's own dialect
const USED_TABLES_DIALECT: &str = "postgres";

/// Split `schema.table`; any other shape yields `None`
fn two_part(name: &str) -> Option<(&str, &str)> {
    let mut parts = name.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(schema), Some(table), None) => Some((schema, table)),
        _ => None,
    }
}

/// Summary slot of one connection, filled by its first successful fetch
type SummarySlot = Arc<OnceCell<Mutex<Arc<DbDatabase>>>>;

/// Rewrites queries so they read shadow tables of the active environment.
///
/// Database summaries are fetched once per connection name and cached for
/// the lifetime of the modifier. Fetches for different connections run
/// independently.
pub struct DevEnvQueryModifier {
    dialect: Dialect,
    connections: Arc<dyn ConnectionGetter>,
    environment: Option<DevEnvironment>,
    summaries: Mutex<HashMap<String, SummarySlot>>,
}

impl DevEnvQueryModifier {
    pub fn new(
        dialect: Dialect,
        connections: Arc<dyn ConnectionGetter>,
        environment: Option<DevEnvironment>,
    ) -> Self {
        Self {
            dialect,
            connections,
            environment,
            summaries: Mutex::new(HashMap::new()),
        }
    }

    fn schema_prefix(&self) -> Option<&str> {
        self.environment
            .as_ref()
            .map(|env| env.schema_prefix.as_str())
            .filter(|prefix| !prefix.is_empty())
    }

    /// Rewrite `query` for the active environment.
    ///
    /// Returns the query unchanged when no prefixed environment is active or
    /// the asset name is not `schema.table`. Table parsing and the summary
    /// fetch run concurrently; the first error wins.
    pub async fn modify(
        &self,
        pipeline: &dyn Pipeline,
        asset: &Asset,
        query: &Query,
    ) -> DevEnvResult<Query> {
        let Some(prefix) = self.schema_prefix() else {
            return Ok(query.clone());
        };
        let Some((asset_schema, asset_table)) = two_part(&asset.name) else {
            return Ok(query.clone());
        };

        let conn_name = pipeline.connection_name_for_asset(asset)?;
        let conn = self
            .connections
            .connection(&conn_name)
            .ok_or_else(|| DbError::ConnectionNotFound {
                name: conn_name.clone(),
            })?;
        let summarizer = conn
            .as_database_summarizer()
            .ok_or_else(|| DevEnvError::Unsupported {
                asset_type: asset.asset_type.clone(),
            })?;

        let sql = query.query.clone();
        let parse = async move {
            tokio::task::spawn_blocking(move || used_tables(&sql, USED_TABLES_DIALECT))
                .await
                .map_err(|e| DevEnvError::TaskFailed(e.to_string()))?
                .map_err(DevEnvError::from)
        };
        let (tables, summary) =
            tokio::try_join!(parse, self.summary_for(&conn_name, summarizer))?;

        let mut mapping = HashMap::new();
        // the asset itself may already carry the prefix, so a self-reference
        // through its production name must resolve to it
        if let Some(unprefixed) = asset_schema.strip_prefix(prefix).filter(|s| !s.is_empty()) {
            mapping.insert(format!("{unprefixed}.{asset_table}"), asset.name.clone());
        }
        for reference in &tables {
            let Some((schema, table)) = two_part(reference) else {
                continue;
            };
            let dev_schema = format!("{prefix}{schema}");
            if summary.table_exists(&dev_schema, table) {
                mapping.insert(reference.clone(), format!("{dev_schema}.{table}"));
            }
        }

        if mapping.is_empty() {
            return Ok(query.clone());
        }
        log::debug!("rewriting {} for environment: {:?}", asset.name, mapping);

        let rewritten = rename_tables(&query.query, self.dialect.parser_name(), &mapping)?;
        Ok(Query::with_variables(
            rewritten,
            query.variable_definitions.clone(),
        ))
    }

    /// Cached summary for `conn_name`.
    ///
    /// Concurrent callers on the same connection wait for a single fetch; a
    /// failed fetch leaves the slot empty for the next caller.
    async fn summary_for(
        &self,
        conn_name: &str,
        summarizer: &dyn DatabaseSummarizer,
    ) -> DevEnvResult<Arc<DbDatabase>> {
        let slot = Arc::clone(
            self.summaries
                .lock()
                .await
                .entry(conn_name.to_string())
                .or_default(),
        );

        let summary = slot
            .get_or_try_init(|| async move {
                log::debug!("fetching database summary for connection '{conn_name}'");
                let summary = summarizer.get_database_summary().await?;
                Ok::<_, DevEnvError>(Mutex::new(Arc::new(summary)))
            })
            .await?;
        let current = Arc::clone(&*summary.lock().await);
        Ok(current)
    }

    /// Record the asset's table in its connection's cached summary.
    ///
    /// Assets created during a run become visible to later rewrites. This is
    /// a no-op when nothing is cached for the connection or the asset name is
    /// not `schema.table`.
    pub async fn register_asset_for_schema_cache(&self, pipeline: &dyn Pipeline, asset: &Asset) {
        let Ok(conn_name) = pipeline.connection_name_for_asset(asset) else {
            return;
        };
        let Some((schema, table)) = two_part(&asset.name) else {
            return;
        };

        let Some(slot) = self.summaries.lock().await.get(&conn_name).cloned() else {
            return;
        };
        let Some(summary) = slot.get() else {
            return;
        };
        let mut summary = summary.lock().await;
        if Arc::make_mut(&mut *summary).register_table(schema, table) {
            log::debug!("registered {} in summary of '{conn_name}'", asset.name);
        }
    }
}

#[cfg(test)]
#[path = "modifier_test.rs"]
mod tests;
