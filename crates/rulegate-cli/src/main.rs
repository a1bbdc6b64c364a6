//! rulegate CLI tool.
//!
//! Usage:
//! ```bash
//! rulegate check [OPTIONS] [PATH]
//! rulegate list-rules [PATH]
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Declarative text rule checks for build pipelines
#[derive(Parser)]
#[command(name = "rulegate")]
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
    /// Scan the project and exit non-zero on error findings
    Check {
        /// Path to scan (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Rules directory (default: `scan.rules_path` under PATH)
        #[arg(long)]
        rules_dir: Option<PathBuf>,

        /// Only scan files matching these globs (can be specified multiple times)
        #[arg(short, long)]
        include: Vec<String>,

        /// Apply available fixes in place before reporting
        #[arg(long)]
        fix: bool,
    },

    /// List active rules
    ListRules {
        /// Project path (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Rules directory (default: `scan.rules_path` under PATH)
        #[arg(long)]
        rules_dir: Option<PathBuf>,
    },
}

/// Output format for scan results.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Findings grouped by severity, with source snippets.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One-line-per-finding compact format.
    Compact,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check {
            path,
            format,
            rules_dir,
            include,
            fix,
        } => {
            let source = config_resolver::resolve(&path, cli.config.as_deref());
            commands::check::run(
                commands::check::CheckArgs {
                    path,
                    format,
                    rules_dir,
                    include,
                    fix,
                },
                &source,
            )
        }
        Commands::ListRules { path, rules_dir } => {
            let source = config_resolver::resolve(&path, cli.config.as_deref());
            commands::list_rules::run(&path, rules_dir, &source)
        }
    }
}
