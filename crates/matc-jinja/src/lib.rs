//! matc-jinja - Jinja templating layer for matc
//!
//! Renders `{{ }}` placeholders in source queries against a per-run context
//! (`start_date`, `end_timestamp`, `run_id`, `pipeline`, `this`, `var`, ...)
//! with strict undefined handling, plus the date filters (`add_days`,
//! `date_format`, `truncate_month`, ...) templates use to shift the window.

pub mod context;
pub mod environment;
pub mod error;
pub mod filters;

pub use context::RunContext;
pub use environment::{QueryRenderer, Renderer};
pub use error::{JinjaError, JinjaResult};
