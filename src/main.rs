//! content-set - Bake and package content sets for a virtual-world server.

mod asset;
mod bake;
mod build;
mod cli;
mod config;
mod entity;
mod logger;
mod package;
mod prompt;
mod pull;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::ContentConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = ContentConfig::load(&cli)?;
    if let Some(path) = &config.config_path {
        debug!(config.build.verbose, "config"; "using {}", path.display());
    }

    match &cli.command {
        Commands::Build { .. } => cli::run_build(&config),
        Commands::Package { archive, .. } => cli::run_package(&config, archive),
        Commands::Pull { .. } => cli::run_pull(&config),
    }
}
