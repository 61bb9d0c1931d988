//! Command-line interface.
//!
//! Unified CLI for Strata catalog and activation operations.

pub mod commands;

use clap::{Parser, Subcommand};

/// Strata - layer-group engine for geospatial visualization.
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path.
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configuration operations.
    Config(commands::ConfigArgs),
    /// Render a catalog as a display tree.
    Tree(commands::TreeArgs),
    /// Run a simulated activation over a catalog.
    Activate(commands::ActivateArgs),
}
