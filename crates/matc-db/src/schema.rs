//! Idempotent schema creation with a process-wide cache

use crate::error::{DbError, DbResult};
use crate::traits::Connection;
use matc_core::{Asset, Query};
use std::collections::HashSet;
use std::sync::Mutex;

/// Ensures the schema of an asset exists, at most once per schema name.
///
/// Names are upper-cased before caching, so `raw` and `RAW` share an entry.
/// A failed creation is not cached and will be retried.
#[derive(Debug, Default)]
pub struct SchemaCreator {
    created: Mutex<HashSet<String>>,
}

impl SchemaCreator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `CREATE SCHEMA IF NOT EXISTS` for the asset's schema component.
    ///
    /// Assets without a schema component are a no-op.
    pub async fn create_schema_if_not_exist(
        &self,
        conn: &dyn Connection,
        asset: &Asset,
    ) -> DbResult<()> {
        let Some(schema) = asset.schema_name() else {
            return Ok(());
        };
        let schema = schema.to_uppercase();

        if self.is_created(&schema)? {
            return Ok(());
        }

        let query = Query::new(format!("CREATE SCHEMA IF NOT EXISTS {schema}"));
        conn.run_query_without_result(&query)
            .await
            .map_err(|source| DbError::SchemaCreation {
                schema: schema.clone(),
                source: Box::new(source),
            })?;

        log::debug!("ensured schema {schema}");
        self.created
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?
            .insert(schema);
        Ok(())
    }

    fn is_created(&self, schema: &str) -> DbResult<bool> {
        Ok(self
            .created
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?
            .contains(schema))
    }
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
