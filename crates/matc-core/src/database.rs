//! Warehouse schema snapshots returned by database-summary capable connections.

use serde::{Deserialize, Serialize};

/// Snapshot of the schemas and tables visible through one connection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbDatabase {
    pub name: String,
    #[serde(default)]
    pub schemas: Vec<DbSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbSchema {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<DbTable>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbTable {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<DbColumn>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
}

impl DbDatabase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schemas: Vec::new(),
        }
    }

    /// Exact-match lookup of `schema.table`
    pub fn table_exists(&self, schema: &str, table: &str) -> bool {
        self.schemas
            .iter()
            .filter(|s| s.name == schema)
            .any(|s| s.tables.iter().any(|t| t.name == table))
    }

    /// Add `schema.table` unless an entry already matches case-insensitively.
    ///
    /// Returns true when the snapshot changed.
    pub fn register_table(&mut self, schema: &str, table: &str) -> bool {
        let mut target = None;
        for (i, s) in self.schemas.iter().enumerate() {
            if !s.name.eq_ignore_ascii_case(schema) {
                continue;
            }
            if s.tables.iter().any(|t| t.name.eq_ignore_ascii_case(table)) {
                return false;
            }
            target = Some(i);
        }

        let idx = match target {
            Some(idx) => idx,
            None => {
                self.schemas.push(DbSchema {
                    name: schema.to_string(),
                    tables: Vec::new(),
                });
                self.schemas.len() - 1
            }
        };
        self.schemas[idx].tables.push(DbTable {
            name: table.to_string(),
            columns: Vec::new(),
        });
        true
    }
}

impl DbSchema {
    /// Schema with bare table entries, used mostly to build fixtures
    pub fn with_tables(name: impl Into<String>, tables: &[&str]) -> Self {
        Self {
            name: name.into(),
            tables: tables
                .iter()
                .map(|t| DbTable {
                    name: t.to_string(),
                    columns: Vec::new(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
#[path = "database_test.rs"]
mod tests;
