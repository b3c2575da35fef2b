//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Stable redirect and image mirror generator
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: redirkit.toml)
    #[arg(short = 'C', long, global = true, default_value = "redirkit.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Output directory path (relative to project root)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Request data directory path (relative to project root)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub data: Option<PathBuf>,

    /// Print debug messages
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Generate the output directory and its state files
    #[command(visible_alias = "b")]
    Build {
        /// Public base URL of the output (overrides [site] url)
        #[arg(short = 'U', long = "site-url", value_hint = clap::ValueHint::Url)]
        site_url: Option<String>,

        /// Disable the progress line
        #[arg(long)]
        no_progress: bool,
    },

    /// Check request documents without fetching or writing anything
    #[command(visible_alias = "v")]
    Validate {
        /// Fail if any document or entry is rejected
        #[arg(long)]
        strict: bool,
    },

    /// Decrypt an encrypted state file and print its mapping
    Inspect {
        /// Encrypted state file (relative paths also tried inside the output)
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build_with_overrides() {
        let cli = Cli::parse_from([
            "redirkit",
            "build",
            "-U",
            "https://pages.test/",
            "--output",
            "public",
            "--no-progress",
        ]);
        assert_eq!(cli.output, Some(PathBuf::from("public")));
        assert!(matches!(
            cli.command,
            Commands::Build { site_url: Some(ref url), no_progress: true } if url == "https://pages.test/"
        ));
    }

    #[test]
    fn test_parse_validate_strict() {
        let cli = Cli::parse_from(["redirkit", "-v", "validate", "--strict"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("redirkit.toml"));
        assert!(matches!(cli.command, Commands::Validate { strict: true }));
    }

    #[test]
    fn test_command_verify() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
