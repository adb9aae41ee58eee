//! The executable query value produced by extractors and consumed by
//! connections.

use crate::error::{CoreError, CoreResult};
use serde_json::{Map, Value};
use std::fmt;

/// Annotation value that enables annotations without user-supplied keys
pub const DEFAULT_QUERY_ANNOTATIONS: &str = "default";

/// One executable statement plus the variable definitions that must run
/// before it in the same session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// `SET`/`DECLARE` statements seen before this query, in order
    pub variable_definitions: Vec<String>,
    /// Statement text without the variable definitions
    pub query: String,
}

impl Query {
    /// Query with no preceding variable definitions
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            variable_definitions: Vec::new(),
            query: query.into(),
        }
    }

    pub fn with_variables(query: impl Into<String>, variable_definitions: Vec<String>) -> Self {
        Self {
            variable_definitions,
            query: query.into(),
        }
    }

    /// Script form suitable for a dry run: definitions, then the statement,
    /// always ending in exactly one `;`.
    pub fn to_dry_run_query(&self) -> String {
        self.script(&self.query)
    }

    /// Same as [`Query::to_dry_run_query`] with the statement wrapped in `EXPLAIN`.
    pub fn to_explain_query(&self) -> String {
        self.script(&format!("EXPLAIN {}", self.query))
    }

    fn script(&self, statement: &str) -> String {
        let mut out = String::new();
        if !self.variable_definitions.is_empty() {
            out.push_str(&self.variable_definitions.join(";\n"));
            out.push_str(";\n");
        }
        out.push_str(statement.trim_end().trim_end_matches(';'));
        out.push(';');
        out
    }

    /// Prepend a `-- @bruin.config: {...}` comment describing where the query
    /// came from.
    ///
    /// `annotations` is either empty (no comment), [`DEFAULT_QUERY_ANNOTATIONS`],
    /// or a JSON object whose keys are merged over `asset`, `type` and `pipeline`.
    pub fn annotated(
        &self,
        annotations: &str,
        asset_name: &str,
        task_type: &str,
        pipeline_name: &str,
    ) -> CoreResult<Query> {
        if annotations.is_empty() {
            return Ok(self.clone());
        }

        let mut merged = Map::new();
        merged.insert("asset".into(), Value::String(asset_name.to_string()));
        merged.insert("type".into(), Value::String(task_type.to_string()));
        merged.insert("pipeline".into(), Value::String(pipeline_name.to_string()));

        if annotations != DEFAULT_QUERY_ANNOTATIONS {
            let user: Map<String, Value> =
                serde_json::from_str(annotations).map_err(|e| CoreError::InvalidAnnotations {
                    annotations: annotations.to_string(),
                    source: e,
                })?;
            merged.extend(user);
        }

        let json = serde_json::to_string(&Value::Object(merged))?;
        Ok(Query {
            variable_definitions: self.variable_definitions.clone(),
            query: format!("-- @bruin.config: {json}\n{}", self.query),
        })
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.query)
    }
}

impl From<&str> for Query {
    fn from(query: &str) -> Self {
        Query::new(query)
    }
}

impl From<String> for Query {
    fn from(query: String) -> Self {
        Query::new(query)
    }
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
