//! Render command implementation

use anyhow::{anyhow, bail, Context, Result};
use matc_core::{MaterializationStrategy, Query};
use matc_jinja::Renderer;
use matc_materialize::materializer_for;

use crate::cli::{GlobalArgs, RenderArgs};
use crate::commands::common::{print_query, Workspace};

/// Execute the render command
pub(crate) async fn execute(args: &RenderArgs, global: &GlobalArgs) -> Result<()> {
    let workspace = Workspace::load(global, &args.source, args.full_refresh)?;
    let query = materialize(&workspace)?;
    print_query(&query, args.output)
}

/// Materialize the single query of the workspace's asset.
///
/// Time-interval output carries window placeholders, which are rendered
/// with the asset's template context before returning.
pub(crate) fn materialize(workspace: &Workspace) -> Result<Query> {
    let mut queries = workspace.extract()?;
    if queries.len() > 1 {
        bail!(
            "Asset '{}' has {} queries; materialization needs exactly one (use `matc extract` to split the file)",
            workspace.asset.name,
            queries.len()
        );
    }
    let first = queries
        .pop()
        .ok_or_else(|| anyhow!("No query found for asset '{}'", workspace.asset.name))?;

    let materializer = materializer_for(workspace.config.dialect, workspace.config.full_refresh);
    if materializer.full_refresh() {
        log::info!("full refresh requested for {}", workspace.asset.name);
    }

    let mut sql = materializer
        .render_sql(&workspace.asset, &first.query)
        .context("Failed to materialize the query")?;

    if materializer.effective_strategy(&workspace.asset) == MaterializationStrategy::TimeInterval {
        sql = workspace
            .renderer
            .render(&sql)
            .context("Cannot render the time_interval window")?;
    }

    Ok(Query::with_variables(sql, first.variable_definitions))
}
