//! # depsync
//!
//! Command-line driver for descriptor dependency generation.
//!
//! ## Usage
//!
//! ```bash
//! # Check mode: fail on drift, blocking errors or stale suppressions
//! depsync generate -g graph.json -d descriptors.json -s suppressions.json
//!
//! # Capture current drift as suppressions
//! depsync generate -g graph.json -d descriptors.json -s suppressions.json --update
//!
//! # Convert a graph document into a binary snapshot
//! depsync snapshot -g graph.json -o graph.dpsg
//! ```

use clap::Parser;
use depsync::cli::{self, RunStatus};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // DEPSYNC_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("DEPSYNC_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "depsync=info,depsync_core=info".into());

    // Logs go to stderr so JSON reports on stdout stay parseable.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        println!("depsync v{}", env!("CARGO_PKG_VERSION"));
        println!();
    }

    match cli::execute(cli).await {
        Ok(RunStatus::Passed) => {}
        Ok(RunStatus::Failed) => std::process::exit(1),
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
