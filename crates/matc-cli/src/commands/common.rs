//! Shared utilities for CLI commands

use anyhow::{anyhow, bail, Context, Result};
use matc_core::{Asset, CompilerConfig, CoreError, Dialect, Query};
use matc_jinja::{QueryRenderer, Renderer, RunContext};
use matc_sql::extractor_for;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::cli::{GlobalArgs, OutputFormat, SourceArgs};

/// Everything a command needs to work on one source file
pub(crate) struct Workspace {
    pub config: CompilerConfig,
    pub asset: Asset,
    pub content: String,
    /// Renderer bound to the asset, so `{{ this }}` resolves
    pub renderer: Arc<dyn Renderer>,
}

impl Workspace {
    /// Load config, asset and source, then apply command-line overrides
    pub(crate) fn load(global: &GlobalArgs, source: &SourceArgs, full_refresh: bool) -> Result<Self> {
        let mut config = load_config(global)?;
        let file = Path::new(&source.file);
        let asset = load_asset(source.asset.as_deref(), file)?;
        apply_overrides(&mut config, source, &asset)?;
        config.full_refresh |= full_refresh;

        let content = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;

        let context = run_context(&config)?;
        let renderer: Arc<dyn Renderer> =
            Arc::from(QueryRenderer::new(context).clone_for_asset(&asset.name));

        Ok(Self {
            config,
            asset,
            content,
            renderer,
        })
    }

    /// Extract the executable queries of the source file
    pub(crate) fn extract(&self) -> Result<Vec<Query>> {
        extractor_for(self.config.extractor_kind(), Arc::clone(&self.renderer))
            .extract_queries(&self.content)
            .with_context(|| format!("Cannot extract queries for asset '{}'", self.asset.name))
    }
}

/// Load `matc.yml` from `--config` or the project directory; a project
/// without one runs on defaults
pub(crate) fn load_config(global: &GlobalArgs) -> Result<CompilerConfig> {
    if let Some(path) = &global.config {
        return CompilerConfig::load(Path::new(path))
            .with_context(|| format!("Failed to load config from {path}"));
    }

    match CompilerConfig::load_from_dir(Path::new(&global.project_dir)) {
        Ok(config) => Ok(config),
        Err(CoreError::ConfigNotFound { path }) => {
            log::debug!("no config at {path}, using defaults");
            Ok(CompilerConfig::default())
        }
        Err(e) => Err(e).context("Failed to load project config"),
    }
}

/// Read the asset definition, or build a passthrough asset named after the file
pub(crate) fn load_asset(path: Option<&str>, file: &Path) -> Result<Asset> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read asset definition {path}"))?;
            serde_yaml::from_str(&content).with_context(|| format!("Invalid asset definition {path}"))
        }
        None => {
            let name = file
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| anyhow!("Cannot derive an asset name from {}", file.display()))?;
            Ok(Asset::new(name))
        }
    }
}

/// Merge command-line flags over the loaded config.
///
/// The dialect comes from `--dialect`, then the asset type, then the config.
pub(crate) fn apply_overrides(
    config: &mut CompilerConfig,
    source: &SourceArgs,
    asset: &Asset,
) -> Result<()> {
    if let Some(dialect) = &source.dialect {
        config.dialect = dialect
            .parse::<Dialect>()
            .with_context(|| format!("Invalid --dialect '{dialect}'"))?;
    } else if let Some(dialect) = Dialect::from_asset_type(&asset.asset_type) {
        config.dialect = dialect;
    }

    if source.start_date.is_some() {
        config.start_date = source.start_date.clone();
    }
    if source.end_date.is_some() {
        config.end_date = source.end_date.clone();
    }

    if let Some(vars_json) = &source.vars {
        let extra: HashMap<String, serde_json::Value> =
            serde_json::from_str(vars_json).context("Invalid --vars JSON")?;
        config.vars.extend(extra);
    }
    Ok(())
}

/// Template context for the configured window; yesterday when none is set
pub(crate) fn run_context(config: &CompilerConfig) -> Result<RunContext> {
    let context = match (&config.start_date, &config.end_date) {
        (Some(start), Some(end)) => RunContext::from_window(start, end, config.pipeline.clone())
            .context("Invalid run window")?,
        (None, None) => RunContext::yesterday(config.pipeline.clone()),
        _ => bail!("start_date and end_date must be given together"),
    };
    Ok(context
        .with_full_refresh(config.full_refresh)
        .with_vars(config.vars.clone()))
}

/// Print a query as text or as a `{"query": ...}` JSON object
pub(crate) fn print_query(query: &Query, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Text => println!("{}", query.to_dry_run_query()),
        OutputFormat::Json => {
            let js = serde_json::json!({
                "query": query.query,
                "variable_definitions": query.variable_definitions,
            });
            println!("{}", serde_json::to_string(&js)?);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
