//! Configuration types and parsing for `matc.yml` and `environment.yml`

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Target warehouse dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    BigQuery,
    ClickHouse,
    #[default]
    DuckDb,
    MySql,
    Oracle,
    Postgres,
    Redshift,
}

impl Dialect {
    pub const ALL: [Dialect; 7] = [
        Dialect::BigQuery,
        Dialect::ClickHouse,
        Dialect::DuckDb,
        Dialect::MySql,
        Dialect::Oracle,
        Dialect::Postgres,
        Dialect::Redshift,
    ];

    /// Dialect name understood by the SQL parser layer
    pub fn parser_name(self) -> &'static str {
        match self {
            Dialect::BigQuery => "bigquery",
            Dialect::ClickHouse => "clickhouse",
            Dialect::DuckDb => "duckdb",
            Dialect::MySql => "mysql",
            // sqlparser has no Oracle dialect; the generic one accepts its DML
            Dialect::Oracle => "generic",
            Dialect::Postgres => "postgres",
            Dialect::Redshift => "redshift",
        }
    }

    /// Dialect implied by an asset type such as `bq.sql` or `rs.sensor.table`
    pub fn from_asset_type(asset_type: &str) -> Option<Dialect> {
        let prefix = asset_type.split('.').next()?;
        prefix.parse().ok()
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Dialect::BigQuery => "bigquery",
            Dialect::ClickHouse => "clickhouse",
            Dialect::DuckDb => "duckdb",
            Dialect::MySql => "mysql",
            Dialect::Oracle => "oracle",
            Dialect::Postgres => "postgres",
            Dialect::Redshift => "redshift",
        };
        f.write_str(s)
    }
}

impl FromStr for Dialect {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bigquery" | "bq" => Ok(Dialect::BigQuery),
            "clickhouse" | "ch" => Ok(Dialect::ClickHouse),
            "duckdb" => Ok(Dialect::DuckDb),
            "mysql" | "my" => Ok(Dialect::MySql),
            "oracle" => Ok(Dialect::Oracle),
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "redshift" | "rs" => Ok(Dialect::Redshift),
            _ => Err(CoreError::UnknownDialect {
                name: s.to_string(),
            }),
        }
    }
}

/// Which query extractor splits source files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    /// Split on `;`, carrying `SET`/`DECLARE` forward
    #[default]
    Split,
    /// Treat the whole file as one script
    WholeFile,
}

impl Dialect {
    /// Extractor whose output the dialect's validation API accepts
    pub fn default_extractor(self) -> ExtractorKind {
        match self {
            Dialect::BigQuery => ExtractorKind::WholeFile,
            _ => ExtractorKind::Split,
        }
    }
}

/// Developer environment: schemas get shadowed by `schema_prefix + schema`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DevEnvironment {
    pub name: String,
    #[serde(default)]
    pub schema_prefix: String,
}

impl DevEnvironment {
    pub fn new(name: impl Into<String>, schema_prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema_prefix: schema_prefix.into(),
        }
    }

    /// Load the active environment from a YAML file
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = read_config(path)?;
        let env: DevEnvironment = serde_yaml::from_str(&content)?;
        if env.name.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: format!("environment in '{}' has no name", path.display()),
            });
        }
        Ok(env)
    }
}

/// Compiler settings from `matc.yml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    #[serde(default)]
    pub dialect: Dialect,

    /// Coerce incremental table strategies into create+replace
    #[serde(default)]
    pub full_refresh: bool,

    /// Override the dialect's default extractor
    #[serde(default)]
    pub extractor: Option<ExtractorKind>,

    /// Pipeline name exposed to templates
    #[serde(default)]
    pub pipeline: String,

    /// Window start, `YYYY-MM-DD` or an RFC 3339 timestamp
    #[serde(default)]
    pub start_date: Option<String>,

    /// Window end, same formats as `start_date`
    #[serde(default)]
    pub end_date: Option<String>,

    /// User variables exposed to templates as `var`
    #[serde(default)]
    pub vars: HashMap<String, serde_json::Value>,
}

impl CompilerConfig {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = read_config(path)?;
        let config: CompilerConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Look for `matc.yml` or `matc.yaml` in a directory
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("matc.yml");
        let yaml_path = dir.join("matc.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Extractor kind after applying the dialect default
    pub fn extractor_kind(&self) -> ExtractorKind {
        self.extractor
            .unwrap_or_else(|| self.dialect.default_extractor())
    }

    fn validate(&self) -> CoreResult<()> {
        for (field, value) in [("start_date", &self.start_date), ("end_date", &self.end_date)] {
            if let Some(v) = value {
                if !is_date_like(v) {
                    return Err(CoreError::ConfigInvalid {
                        message: format!("{field} '{v}' is neither YYYY-MM-DD nor RFC 3339"),
                    });
                }
            }
        }
        Ok(())
    }
}

fn is_date_like(value: &str) -> bool {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        || chrono::DateTime::parse_from_rfc3339(value).is_ok()
        || chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
        || chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").is_ok()
}

fn read_config(path: &Path) -> CoreResult<String> {
    if !path.exists() {
        return Err(CoreError::ConfigNotFound {
            path: path.display().to_string(),
        });
    }
    std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
