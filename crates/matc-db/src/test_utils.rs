//! Shared test fakes

use crate::error::{DbError, DbResult};
use crate::traits::{Connection, DatabaseSummarizer};
use async_trait::async_trait;
use matc_core::{DbDatabase, Query};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Connection that records every statement and replays a fixed result
#[derive(Default)]
pub(crate) struct RecordingConnection {
    pub executed: Mutex<Vec<String>>,
    pub rows: Mutex<Vec<Vec<Value>>>,
    pub fail_with: Option<String>,
    pub summary: Option<DbDatabase>,
    pub summary_fetches: AtomicUsize,
}

impl RecordingConnection {
    pub fn returning(rows: Vec<Vec<Value>>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn set_rows(&self, rows: Vec<Vec<Value>>) {
        *self.rows.lock().unwrap() = rows;
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    fn record(&self, query: &Query) -> DbResult<()> {
        self.executed.lock().unwrap().push(query.query.clone());
        match &self.fail_with {
            Some(msg) => Err(DbError::ExecutionError(msg.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Connection for RecordingConnection {
    async fn run_query_without_result(&self, query: &Query) -> DbResult<()> {
        self.record(query)
    }

    async fn select(&self, query: &Query) -> DbResult<Vec<Vec<Value>>> {
        self.record(query)?;
        Ok(self.rows.lock().unwrap().clone())
    }

    fn db_type(&self) -> &'static str {
        "recording"
    }

    fn as_database_summarizer(&self) -> Option<&dyn DatabaseSummarizer> {
        self.summary.as_ref().map(|_| self as &dyn DatabaseSummarizer)
    }
}

#[async_trait]
impl DatabaseSummarizer for RecordingConnection {
    async fn get_database_summary(&self) -> DbResult<DbDatabase> {
        self.summary_fetches.fetch_add(1, Ordering::SeqCst);
        self.summary
            .clone()
            .ok_or_else(|| DbError::Internal("no summary configured".to_string()))
    }
}
