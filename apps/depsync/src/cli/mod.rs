//! # depsync CLI Module
//!
//! ## Available Commands
//!
//! - `generate` - Compute dependency plans and reconcile suppressions
//! - `snapshot` - Convert a graph document into a binary snapshot

mod commands;

use clap::{Args, Parser, Subcommand};
use depsync_core::DepsyncError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// depsync - descriptor dependency generator
///
/// Computes the module and plugin dependencies every descriptor must declare
/// and keeps the suppression file in sync with what is actually used.
#[derive(Parser, Debug)]
#[command(name = "depsync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Print per-entity details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Run configuration file (TOML)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute dependency plans and reconcile suppressions
    Generate(GenerateArgs),

    /// Convert a graph document into a binary snapshot
    Snapshot {
        /// Graph document (JSON or binary)
        #[arg(short, long)]
        graph: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Arguments of `generate`.
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Graph document (JSON or binary snapshot)
    #[arg(short, long)]
    pub graph: PathBuf,

    /// Descriptor snapshots (JSON)
    #[arg(short, long)]
    pub descriptors: PathBuf,

    /// Suppression file (JSON); created on --update if missing
    #[arg(short, long, default_value = "suppressions.json")]
    pub suppressions: PathBuf,

    /// Capture drift between graph and descriptors as suppressions
    #[arg(short, long)]
    pub update: bool,

    /// Maximum number of entities planned at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Write all plans as JSON to this path
    #[arg(long)]
    pub plans: Option<PathBuf>,
}

/// How a successful invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Passed,
    /// The command ran, but its result fails the build.
    Failed,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<RunStatus, DepsyncError> {
    let output = OutputMode {
        json: cli.json_mode,
        verbose: cli.verbose,
    };
    match cli.command {
        Commands::Generate(args) => cmd_generate(cli.config.as_deref(), &args, output).await,
        Commands::Snapshot { graph, output: path } => cmd_snapshot(&graph, &path, output),
    }
}
