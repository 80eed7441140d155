//! code-assert CLI tool.
//!
//! Usage:
//! ```bash
//! code-assert check [OPTIONS] [PATH]...
//! code-assert model [PATH]...
//! code-assert init
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Dependency rules and cycle checks for compiled JVM code
#[derive(Parser)]
#[command(name = "code-assert")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check dependency rules and cycles
    Check {
        /// Class directories, class files, archives or sources (default: `model.inputs`)
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Skip cycle detection
        #[arg(long)]
        no_cycles: bool,

        /// Fail when rules, ignore patterns or cycle exceptions are unused
        #[arg(long)]
        fail_on_unused: bool,
    },

    /// Print the package model
    Model {
        /// Class directories, class files, archives or sources (default: `model.inputs`)
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: ModelFormat,
    },

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Output format for check results.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One-line-per-finding compact format.
    Compact,
}

/// Output format for the package model.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum ModelFormat {
    /// Indented package list.
    #[default]
    Text,
    /// JSON output.
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let project_dir = std::env::current_dir()?;
    match cli.command {
        Commands::Check {
            paths,
            format,
            no_cycles,
            fail_on_unused,
        } => {
            let source = config_resolver::resolve(&project_dir, cli.config.as_deref());
            commands::check::run(&paths, format, no_cycles, fail_on_unused, &source)
        }
        Commands::Model { paths, format } => {
            let source = config_resolver::resolve(&project_dir, cli.config.as_deref());
            commands::model::run(&paths, format, &source)
        }
        Commands::Init { force } => commands::init::run(&project_dir, force),
    }
}
