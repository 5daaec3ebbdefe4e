//! CLI entry point for taskdeck.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use taskdeck_app::ServiceConfig;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod commands;

/// Task records with validated mutations and filtered search.
#[derive(Parser, Debug)]
#[command(
    name = "taskdeck",
    version,
    about = "taskdeck: validated task records with structured search"
)]
struct Cli {
    /// Directory holding `.taskdeck/config.toml` (defaults to current).
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Document file to use instead of the configured store.
    #[arg(long)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a task from a JSON object (`-` reads stdin).
    Create { body: String },

    /// Show a task.
    Get { id: Option<String> },

    /// Replace a task with a JSON object carrying its id.
    Update { body: String },

    /// Merge the set fields of a JSON object into a stored task.
    Patch { body: String },

    /// Delete a task.
    Delete { id: Option<String> },

    /// Search with a JSON filter object.
    Search {
        #[arg(default_value = "{}")]
        filter: String,
    },

    /// Answer line-delimited JSON requests from stdin until EOF.
    Serve,
}

fn main() -> Result<()> {
    let Cli { dir, store, cmd } = Cli::parse();
    install_tracing();

    let config = load_config(dir, store)?;
    let status = tokio::runtime::Runtime::new()?.block_on(commands::run(cmd, &config))?;
    if !status.is_success() {
        bail!("request failed with status {status}");
    }
    Ok(())
}

fn load_config(dir: Option<PathBuf>, store: Option<PathBuf>) -> Result<ServiceConfig> {
    let dir = dir.unwrap_or_else(|| PathBuf::from("."));
    let config = ServiceConfig::from_workdir(&dir)?;
    Ok(match store {
        Some(path) => config.with_store_path(path),
        None => config,
    })
}

fn install_tracing() {
    // RUST_LOG overrides the level; INFO by default. Stdout is reserved for responses.
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
