//! Config command implementation.

use crate::core::config::Config;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

/// Configuration operations.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Validate configuration file.
    Validate {
        /// Config file path.
        #[arg(short, long, default_value = "config/strata.toml")]
        config: PathBuf,
    },
    /// Print configuration with defaults.
    Show {
        /// Config file path; defaults are shown when absent.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output format (toml, json).
        #[arg(long, default_value = "toml")]
        format: String,
    },
    /// Generate a configuration template.
    Generate {
        /// Output file path; stdout when absent.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Run the config command.
pub fn run_config(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Validate { config } => validate_config(&config),
        ConfigCommand::Show { config, format } => show_config(config.as_deref(), &format),
        ConfigCommand::Generate { output } => generate_config(output.as_deref()),
    }
}

fn validate_config(path: &Path) -> Result<()> {
    Config::from_file(path)
        .with_context(|| format!("configuration invalid: {}", path.display()))?;
    println!("Configuration OK: {}", path.display());
    Ok(())
}

fn show_config(path: Option<&Path>, format: &str) -> Result<()> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&config)?),
        _ => print!("{}", toml::to_string_pretty(&config)?),
    }
    Ok(())
}

fn generate_config(output: Option<&Path>) -> Result<()> {
    let template = toml::to_string_pretty(&Config::default())?;
    match output {
        Some(path) => {
            std::fs::write(path, template)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote configuration template: {}", path.display());
        }
        None => print!("{template}"),
    }
    Ok(())
}
