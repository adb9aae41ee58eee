//! Connection traits
//!
//! Only [`Connection`] is mandatory. Optional capabilities are discovered
//! through the `as_*` accessors, which default to `None`.

use crate::error::{DbError, DbResult};
use async_trait::async_trait;
use matc_core::{Asset, DbDatabase, Query};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A live warehouse connection.
///
/// Implementations must be Send + Sync for async operation.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Run a statement (with its variable definitions) and discard any rows
    async fn run_query_without_result(&self, query: &Query) -> DbResult<()>;

    /// Run a query and return its rows as JSON cells
    async fn select(&self, query: &Query) -> DbResult<Vec<Vec<Value>>>;

    /// Connection type identifier for logging
    fn db_type(&self) -> &'static str;

    fn as_database_summarizer(&self) -> Option<&dyn DatabaseSummarizer> {
        None
    }

    fn as_table_exists_checker(&self) -> Option<&dyn TableExistsChecker> {
        None
    }
}

/// Connections that can snapshot their schemas and tables
#[async_trait]
pub trait DatabaseSummarizer: Send + Sync {
    async fn get_database_summary(&self) -> DbResult<DbDatabase>;
}

/// Connections with a native table-existence check
#[async_trait]
pub trait TableExistsChecker: Send + Sync {
    async fn table_exists(&self, schema: &str, table: &str) -> DbResult<bool>;
}

/// Looks up connections by name
pub trait ConnectionGetter: Send + Sync {
    fn connection(&self, name: &str) -> Option<Arc<dyn Connection>>;
}

/// Resolves which connection an asset runs against
pub trait Pipeline: Send + Sync {
    fn name(&self) -> &str;

    fn connection_name_for_asset(&self, asset: &Asset) -> DbResult<String>;
}

/// Resolve the asset's connection through both lookups
pub fn connection_for_asset(
    connections: &dyn ConnectionGetter,
    pipeline: &dyn Pipeline,
    asset: &Asset,
) -> DbResult<Arc<dyn Connection>> {
    let name = pipeline.connection_name_for_asset(asset)?;
    connections
        .connection(&name)
        .ok_or(DbError::ConnectionNotFound { name })
}

/// Name-keyed connection registry
#[derive(Clone, Default)]
pub struct ConnectionManager {
    connections: HashMap<String, Arc<dyn Connection>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, connection: Arc<dyn Connection>) -> Self {
        self.insert(name, connection);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, connection: Arc<dyn Connection>) {
        self.connections.insert(name.into(), connection);
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl ConnectionGetter for ConnectionManager {
    fn connection(&self, name: &str) -> Option<Arc<dyn Connection>> {
        self.connections.get(name).cloned()
    }
}

/// Pipeline that routes assets to their declared connection, or to a
/// default when none is declared
#[derive(Debug, Clone)]
pub struct StaticPipeline {
    name: String,
    default_connection: String,
}

impl StaticPipeline {
    pub fn new(name: impl Into<String>, default_connection: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_connection: default_connection.into(),
        }
    }
}

impl Pipeline for StaticPipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn connection_name_for_asset(&self, asset: &Asset) -> DbResult<String> {
        Ok(asset
            .connection
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.default_connection.clone()))
    }
}

#[cfg(test)]
#[path = "traits_test.rs"]
mod tests;
