//! Extract command implementation

use anyhow::Result;

use crate::cli::{ExtractArgs, GlobalArgs, OutputFormat};
use crate::commands::common::{print_query, Workspace};

/// Execute the extract command
pub(crate) async fn execute(args: &ExtractArgs, global: &GlobalArgs) -> Result<()> {
    let workspace = Workspace::load(global, &args.source, false)?;
    let queries = workspace.extract()?;
    log::info!(
        "extracted {} queries from {} ({})",
        queries.len(),
        args.source.file,
        workspace.config.dialect
    );

    match args.output {
        OutputFormat::Text => {
            for query in &queries {
                print_query(query, OutputFormat::Text)?;
            }
        }
        OutputFormat::Json => {
            let js: Vec<_> = queries
                .iter()
                .map(|q| {
                    serde_json::json!({
                        "query": q.query,
                        "variable_definitions": q.variable_definitions,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&js)?);
        }
    }
    Ok(())
}
