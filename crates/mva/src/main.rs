//! mva - mv-archive
//!
//! Main entry point for the mva CLI.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

mod commands;

use commands::{archive, init, setup, start, status};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// mva - watch directories, archive finished files and upload them with rclone
#[derive(Parser)]
#[command(name = "mva")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: $MVA_CONFIG_DIR/config.yml or ~/.mva/config.yml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a default configuration file
    Init(init::InitArgs),

    /// Watch configured directories until interrupted
    Start(start::StartArgs),

    /// Archive files now to a configured destination
    Archive(archive::ArchiveArgs),

    /// Show configuration and pending files
    Status(status::StatusArgs),

    /// Create every configured watch directory
    SetupDirectories(setup::SetupArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Tracing: console (human-readable, stderr) + rotating JSON file
    let filter = if cli.verbose {
        "mva=debug,mva_config=debug,mva_archive=debug,mva_daemon=debug,info"
    } else {
        "mva=info,mva_archive=info,mva_daemon=info,warn"
    };

    let log_dir = mva_config::config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "mva.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "mva=trace,mva_config=trace,mva_archive=trace,mva_daemon=trace,info",
                )),
        )
        .init();

    let config_path = match cli.config {
        Some(path) => path,
        None => mva_config::config_path()
            .context("Could not determine config location; set MVA_CONFIG_DIR or pass --config")?,
    };

    let ctx = commands::Context {
        config_path,
        verbose: cli.verbose,
    };

    // Dispatch to command handlers
    match cli.command {
        Commands::Init(args) => init::run(args, &ctx).await,
        Commands::Start(args) => start::run(args, &ctx).await,
        Commands::Archive(args) => archive::run(args, &ctx).await,
        Commands::Status(args) => status::run(args, &ctx).await,
        Commands::SetupDirectories(args) => setup::run(args, &ctx).await,
    }
}
