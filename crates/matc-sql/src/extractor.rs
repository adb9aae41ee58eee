//! Query extraction from source files
//!
//! Two extractors share one contract: take raw file content, expand template
//! placeholders, and return the ordered [`Query`] values to execute.
//!
//! * [`SplittingExtractor`] strips comments, renders, then splits on `;`.
//!   `SET`/`DECLARE` statements are not emitted on their own; each later query
//!   carries every definition seen before it.
//! * [`WholeFileExtractor`] renders the trimmed content and returns it as one
//!   script, for warehouses whose dry-run API accepts multi-statement input.

use crate::comments::strip_comments;
use crate::error::{SqlError, SqlResult};
use matc_core::{Asset, ExtractorKind, Query};
use matc_jinja::Renderer;
use std::path::Path;
use std::sync::Arc;

/// Turns file content into executable queries.
pub trait QueryExtractor: Send + Sync {
    /// Extract queries from in-memory content
    fn extract_queries(&self, content: &str) -> SqlResult<Vec<Query>>;

    /// Extractor of the same kind whose renderer exposes `this`
    fn clone_for_asset(&self, asset: &Asset) -> Box<dyn QueryExtractor>;

    /// Read a file and extract its queries
    fn extract_queries_from_file(&self, path: &Path) -> SqlResult<Vec<Query>> {
        let content = std::fs::read_to_string(path).map_err(|e| SqlError::ReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        self.extract_queries(&content)
    }
}

/// Splits content into statements, carrying variable definitions forward
pub struct SplittingExtractor {
    renderer: Arc<dyn Renderer>,
}

impl SplittingExtractor {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self { renderer }
    }
}

impl QueryExtractor for SplittingExtractor {
    fn extract_queries(&self, content: &str) -> SqlResult<Vec<Query>> {
        let cleaned = strip_comments(content);
        let rendered = self.renderer.render(&cleaned)?;
        Ok(split_queries(&rendered))
    }

    fn clone_for_asset(&self, asset: &Asset) -> Box<dyn QueryExtractor> {
        Box::new(Self {
            renderer: Arc::from(self.renderer.clone_for_asset(&asset.name)),
        })
    }
}

/// Returns the whole rendered file as a single query
pub struct WholeFileExtractor {
    renderer: Arc<dyn Renderer>,
}

impl WholeFileExtractor {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self { renderer }
    }
}

impl QueryExtractor for WholeFileExtractor {
    fn extract_queries(&self, content: &str) -> SqlResult<Vec<Query>> {
        let rendered = self.renderer.render(content.trim())?;
        Ok(vec![Query::new(rendered)])
    }

    fn clone_for_asset(&self, asset: &Asset) -> Box<dyn QueryExtractor> {
        Box::new(Self {
            renderer: Arc::from(self.renderer.clone_for_asset(&asset.name)),
        })
    }
}

/// Build the extractor selected by configuration
pub fn extractor_for(kind: ExtractorKind, renderer: Arc<dyn Renderer>) -> Box<dyn QueryExtractor> {
    match kind {
        ExtractorKind::Split => Box::new(SplittingExtractor::new(renderer)),
        ExtractorKind::WholeFile => Box::new(WholeFileExtractor::new(renderer)),
    }
}

/// Split already-rendered content on `;`.
///
/// Blank lines inside a statement are dropped. Statements starting with `set`
/// or `declare` (any case) accumulate as variable definitions, statements
/// starting with `use` are discarded, and every other statement becomes a
/// [`Query`] holding a snapshot of the definitions accumulated so far.
pub fn split_queries(content: &str) -> Vec<Query> {
    let mut queries = Vec::new();
    let mut variables: Vec<String> = Vec::new();

    for segment in content.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let statement = segment
            .lines()
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        let statement = statement.trim();
        let lower = statement.to_lowercase();

        if lower.starts_with("set") || lower.starts_with("declare") {
            variables.push(statement.to_string());
            continue;
        }
        if lower.starts_with("use") {
            log::debug!("dropping session statement: {statement}");
            continue;
        }

        queries.push(Query::with_variables(statement, variables.clone()));
    }

    queries
}

#[cfg(test)]
#[path = "extractor_test.rs"]
mod tests;
