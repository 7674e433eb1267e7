// SPDX-FileCopyrightText: 2026 Cortex Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cortex - long-term memory for conversational agents.
//!
//! This is the binary entry point: it loads configuration, installs the
//! tracing subscriber, and dispatches to a subcommand.

mod maintenance;
mod serve;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use cortex_config::{CortexConfig, ConfigError};

/// Cortex - long-term memory for conversational agents.
#[derive(Parser, Debug)]
#[command(name = "cortex", version, about, long_about = None)]
struct Cli {
    /// Configuration file to load instead of the default search path.
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Start the HTTP memory service (default).
    Serve,
    /// Compute embeddings for stored memories that lack one.
    Backfill,
    /// Print store statistics as JSON.
    Stats,
}

fn load_config(path: Option<&Path>) -> Result<CortexConfig, Vec<ConfigError>> {
    match path {
        Some(path) => cortex_config::load_and_validate_path(path),
        None => cortex_config::load_and_validate(),
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides `server.log_level`.
///
/// Logs go to stderr so command output on stdout stays machine readable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cortex={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            cortex_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.server.log_level);

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Backfill => maintenance::run_backfill(config).await,
        Commands::Stats => maintenance::run_stats(config).await,
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        eprintln!("cortex: {e}");
        std::process::exit(1);
    }
}
