// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ferry - dual-store migration and mirroring engine.
//!
//! This is the binary entry point. Commands load the primary snapshot and
//! the SQLite secondary named by the configuration.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod engine;
mod migrate;
mod script;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, warn};

use ferry_config::FerryConfig;
use ferry_core::FerryError;
use ferry_metrics::{MetricNames, PrometheusRecorder};

use crate::engine::Engine;

/// Ferry - keep a secondary credential store in step with the primary.
#[derive(Parser, Debug)]
#[command(name = "ferry", version, about, long_about = None)]
struct Cli {
    /// Configuration file to use instead of the XDG lookup.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a checksum-gated migration into the secondary store.
    Migrate,
    /// Show fingerprint, checkpoint, record counts, and diff.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the primary fingerprint, or `empty`.
    Fingerprint,
    /// List records the secondary store is known to mishandle.
    Audit,
    /// Arm the mirror and apply a JSON-lines mutation script to the primary.
    Mirror {
        /// Script file, one mutation per line.
        script: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => ferry_config::load_and_validate_path(path),
        None => ferry_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            ferry_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.general.log_level);

    let recorder = if config.metrics.render_on_exit {
        match PrometheusRecorder::install(&MetricNames::with_prefix(&config.metrics.prefix)) {
            Ok(recorder) => Some(recorder),
            Err(e) => {
                warn!(error = %e, "metrics will not be rendered");
                None
            }
        }
    } else {
        None
    };

    let result = run(cli.command, &config).await;

    if let Some(recorder) = &recorder {
        print!("{}", recorder.render());
    }
    if let Err(e) = result {
        error!(error = %e, "command failed");
        eprintln!("ferry: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &FerryConfig) -> Result<(), FerryError> {
    let engine = Engine::open(config).await?;
    let result = match command {
        Commands::Migrate => migrate::run_migrate(&engine).await.map(drop),
        Commands::Status { json } => status::run_status(&engine, json).await,
        Commands::Fingerprint => status::run_fingerprint(&engine).await,
        Commands::Audit => migrate::run_audit(&engine).await.map(drop),
        Commands::Mirror { script } => script::run_mirror(&engine, &script).await.map(drop),
    };
    engine.close().await;
    result
}

/// Log to stderr. `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ferry={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
