//! Run command implementation
//!
//! Materializes one asset and executes it against a DuckDB database,
//! creating its schema first and applying the developer environment when
//! one is given.

use anyhow::{bail, Context, Result};
use matc_core::{DevEnvironment, Dialect, MaterializationType};
use matc_db::{
    Connection, ConnectionGetter, ConnectionManager, DuckDbConnection, Pipeline, SchemaCreator,
    StaticPipeline,
};
use matc_devenv::DevEnvQueryModifier;
use std::path::Path;
use std::sync::Arc;

use crate::cli::{GlobalArgs, RunArgs};
use crate::commands::common::Workspace;
use crate::commands::render::materialize;

/// Connection name used when the asset does not declare one
const DEFAULT_CONNECTION: &str = "duckdb-default";

/// Execute the run command
pub(crate) async fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let workspace = Workspace::load(global, &args.source, args.full_refresh)?;
    if workspace.config.dialect != Dialect::DuckDb {
        bail!(
            "run executes against DuckDB only, but asset '{}' resolved to {}",
            workspace.asset.name,
            workspace.config.dialect
        );
    }

    let environment = args
        .environment
        .as_deref()
        .map(|path| {
            DevEnvironment::load(Path::new(path))
                .with_context(|| format!("Failed to load environment from {path}"))
        })
        .transpose()?;

    let conn: Arc<dyn Connection> = Arc::new(
        DuckDbConnection::new(&args.duckdb)
            .with_context(|| format!("Failed to open DuckDB at {}", args.duckdb))?,
    );
    let conn_name = workspace
        .asset
        .connection
        .clone()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CONNECTION.to_string());
    let connections: Arc<dyn ConnectionGetter> =
        Arc::new(ConnectionManager::new().with(conn_name, Arc::clone(&conn)));
    let pipeline = StaticPipeline::new(workspace.config.pipeline.clone(), DEFAULT_CONNECTION);

    let mut query = materialize(&workspace)?;

    if workspace.asset.materialization.kind != MaterializationType::None {
        SchemaCreator::new()
            .create_schema_if_not_exist(conn.as_ref(), &workspace.asset)
            .await
            .context("Failed to create the asset schema")?;
    }

    let modifier = DevEnvQueryModifier::new(workspace.config.dialect, connections, environment);
    query = modifier
        .modify(&pipeline, &workspace.asset, &query)
        .await
        .context("Failed to apply the developer environment")?;

    query = query
        .annotated(
            &args.annotations,
            &workspace.asset.name,
            &workspace.asset.asset_type,
            pipeline.name(),
        )
        .context("Invalid --annotations")?;

    log::info!("running {} in pipeline '{}'", workspace.asset.name, pipeline.name());
    log::debug!("{}", query.query);
    conn.run_query_without_result(&query)
        .await
        .with_context(|| format!("Failed to run asset '{}'", workspace.asset.name))?;
    modifier
        .register_asset_for_schema_cache(&pipeline, &workspace.asset)
        .await;

    println!("Ran {}", workspace.asset.name);
    Ok(())
}
