//! vizflow - branching conversation flows on disk
//!
//! Main entry point for the vizflow CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod commands;

use commands::{flow, index, node};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// vizflow - inspect and edit branching conversation flows
#[derive(Parser)]
#[command(name = "vizflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Project storage directory (overrides [storage] base_dir)
    #[arg(long, global = true, env = "VIZFLOW_BASE_DIR")]
    pub base_dir: Option<PathBuf>,

    /// Directory searched for vizflow.toml (default: current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create, edit and render flows
    Flow(flow::FlowArgs),

    /// Store and amend conversation nodes
    Node(node::NodeArgs),

    /// Storage index maintenance
    Index(index::IndexArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = vizflow_config::load_config(cli.project_dir.as_deref())?;
    let config = loaded.config;
    let logging = config.logging();

    // Console (human-readable) on stderr, plus daily JSON files when configured
    let default_filter = if cli.verbose {
        "debug".to_string()
    } else {
        logging.filter.clone()
    };
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let (file_layer, _guard) = match &logging.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "vizflow.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new(
                    "vizflow=trace,vizflow_store=trace,vizflow_graph=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    for warning in &loaded.warnings {
        warn!("{warning}");
    }
    for path in loaded.sources.iter().filter(|s| s.loaded) {
        debug!(path = %path.path.display(), "Loaded config layer");
    }

    let mut project = commands::project_config(&config);
    if let Some(base_dir) = cli.base_dir {
        project.base_dir = base_dir;
    }

    let ctx = commands::Context {
        project,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Flow(args) => flow::run(args, &ctx),
        Commands::Node(args) => node::run(args, &ctx),
        Commands::Index(args) => index::run(args, &ctx),
    }
}
