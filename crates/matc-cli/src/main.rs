//! matc CLI - extract, materialize, and run SQL assets

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::Cli;
use commands::{extract, render, run};

/// Log filter for the `-v` count; `RUST_LOG` still wins when set
fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level(cli.global.verbose)),
    )
    .try_init();

    match &cli.command {
        cli::Commands::Extract(args) => extract::execute(args, &cli.global).await,
        cli::Commands::Render(args) => render::execute(args, &cli.global).await,
        cli::Commands::Run(args) => run::execute(args, &cli.global).await,
    }
}
