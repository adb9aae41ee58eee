//! CLI argument definitions using clap derive API

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

/// matc - materialize SQL assets for BigQuery, ClickHouse, DuckDB, MySQL,
/// Oracle, Postgres and Redshift
#[derive(Parser, Debug)]
#[command(name = "matc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Path to project directory holding matc.yml
    #[arg(
        short = 'p',
        long,
        global = true,
        default_value = ".",
        env = "MATC_PROJECT_DIR"
    )]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true, env = "MATC_CONFIG")]
    pub config: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render templates and split a file into executable queries
    Extract(ExtractArgs),

    /// Materialize an asset's query into dialect SQL
    Render(RenderArgs),

    /// Materialize an asset and execute it against a DuckDB database
    Run(RunArgs),
}

/// Arguments shared by every command that renders a source file
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// SQL source file
    pub file: String,

    /// Asset definition (YAML); defaults to a passthrough asset named after the file
    #[arg(short, long)]
    pub asset: Option<String>,

    /// Override SQL dialect (bigquery, clickhouse, duckdb, mysql, oracle, postgres, redshift)
    #[arg(short, long)]
    pub dialect: Option<String>,

    /// Window start, YYYY-MM-DD or RFC 3339
    #[arg(long)]
    pub start_date: Option<String>,

    /// Window end, YYYY-MM-DD or RFC 3339
    #[arg(long)]
    pub end_date: Option<String>,

    /// Override/add variables as JSON
    #[arg(long)]
    pub vars: Option<String>,
}

/// Arguments for the extract command
#[derive(Args, Debug)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the render command
#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Coerce incremental table strategies into create+replace
    #[arg(long)]
    pub full_refresh: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// DuckDB database file, or :memory:
    #[arg(long, env = "MATC_DUCKDB")]
    pub duckdb: String,

    /// Coerce incremental table strategies into create+replace
    #[arg(long)]
    pub full_refresh: bool,

    /// Developer environment file (YAML with name and schema_prefix)
    #[arg(short, long, env = "MATC_ENVIRONMENT")]
    pub environment: Option<String>,

    /// Prepend a `@bruin.config` comment: "default" or a JSON object of extra keys
    #[arg(long, default_value = "")]
    pub annotations: String,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// SQL text
    Text,
    /// JSON object(s)
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
