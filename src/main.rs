//! Redirkit - stable redirect pages and image mirrors for a static host.

mod cli;
mod config;
mod logger;
mod materialize;
mod reconcile;
mod request;
mod stage;
mod state;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::RedirConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = RedirConfig::load(&cli)?;

    match &cli.command {
        Commands::Build { no_progress, .. } => cli::build::build_site(&config, !no_progress),
        Commands::Validate { strict } => cli::validate::validate_requests(&config, *strict),
        Commands::Inspect { file } => cli::inspect::inspect_state(&config, file),
    }
}
