//! Per-run template context.
//!
//! Every rendered query sees the run window in several textual layouts plus
//! the pipeline name, run id, full-refresh flag, user variables, and, once
//! cloned for an asset, `this`.

use crate::error::{JinjaError, JinjaResult};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Values injected into every template of one run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub pipeline: String,
    /// Unique identifier for this run (UUID v4 unless overridden)
    pub run_id: String,
    pub full_refresh: bool,
    pub vars: HashMap<String, serde_json::Value>,
    /// Name of the asset being rendered, exposed as `{{ this }}`
    pub this: Option<String>,
}

/// Serialized shape of [`RunContext`] as seen by templates
#[derive(Serialize)]
struct TemplateVars<'a> {
    start_date: String,
    start_date_nodash: String,
    start_datetime: String,
    start_timestamp: String,
    end_date: String,
    end_date_nodash: String,
    end_datetime: String,
    end_timestamp: String,
    pipeline: &'a str,
    run_id: &'a str,
    full_refresh: bool,
    var: &'a HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    this: Option<&'a str>,
}

impl RunContext {
    /// Create a context for the given window, generating a fresh `run_id`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, pipeline: impl Into<String>) -> Self {
        Self {
            start,
            end,
            pipeline: pipeline.into(),
            run_id: uuid::Uuid::new_v4().to_string(),
            full_refresh: false,
            vars: HashMap::new(),
            this: None,
        }
    }

    /// Window covering the whole of yesterday in UTC
    pub fn yesterday(pipeline: impl Into<String>) -> Self {
        let today = Utc::now().date_naive();
        let yesterday = today - Duration::days(1);
        let start = Utc.from_utc_datetime(&yesterday.and_hms_opt(0, 0, 0).unwrap_or_default());
        let end = start + Duration::days(1) - Duration::microseconds(1);
        Self::new(start, end, pipeline)
    }

    /// Build a context from textual window bounds as found in config files.
    pub fn from_window(start: &str, end: &str, pipeline: impl Into<String>) -> JinjaResult<Self> {
        Ok(Self::new(parse_bound(start)?, parse_bound(end)?, pipeline))
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn with_full_refresh(mut self, full_refresh: bool) -> Self {
        self.full_refresh = full_refresh;
        self
    }

    pub fn with_vars(mut self, vars: HashMap<String, serde_json::Value>) -> Self {
        self.vars = vars;
        self
    }

    /// Copy of this context with `this` bound to the asset name
    pub fn for_asset(&self, asset_name: &str) -> Self {
        Self {
            this: Some(asset_name.to_string()),
            ..self.clone()
        }
    }

    pub(crate) fn to_template_value(&self) -> minijinja::Value {
        minijinja::Value::from_serialize(TemplateVars {
            start_date: self.start.format("%Y-%m-%d").to_string(),
            start_date_nodash: self.start.format("%Y%m%d").to_string(),
            start_datetime: self.start.format("%Y-%m-%dT%H:%M:%S").to_string(),
            start_timestamp: self.start.to_rfc3339_opts(SecondsFormat::Micros, true),
            end_date: self.end.format("%Y-%m-%d").to_string(),
            end_date_nodash: self.end.format("%Y%m%d").to_string(),
            end_datetime: self.end.format("%Y-%m-%dT%H:%M:%S").to_string(),
            end_timestamp: self.end.to_rfc3339_opts(SecondsFormat::Micros, true),
            pipeline: &self.pipeline,
            run_id: &self.run_id,
            full_refresh: self.full_refresh,
            var: &self.vars,
            this: self.this.as_deref(),
        })
    }
}

fn parse_bound(value: &str) -> JinjaResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| JinjaError::InvalidDate(value.to_string()))
}
