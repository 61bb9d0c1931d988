//! Strata - unified CLI entrypoint.
//!
//! Usage:
//!   strata config validate --config config/strata.toml
//!   strata config show [--format json]
//!   strata tree <catalog.toml> [--by-layers | --mirror] [--format json]
//!   strata activate <catalog.toml> [--fail <id>]... [--delay-ms N]

use anyhow::Result;
use clap::Parser;
use strata::cli::commands::{run_activate, run_config, run_tree};
use strata::cli::{Cli, Commands};
use std::path::Path;

fn init_tracing(log_level: Option<&str>) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let config_path = cli.config.as_deref().map(Path::new);
    match cli.command {
        Commands::Config(args) => run_config(args),
        Commands::Tree(args) => run_tree(args, config_path),
        Commands::Activate(args) => run_activate(args, config_path).await,
    }
}
