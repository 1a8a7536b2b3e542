//! Start command - runs the daemon in the foreground until Ctrl-C.

use anyhow::{Context as _, Result};
use clap::Args;
use mva_daemon::Supervisor;
use tracing::info;

use super::{Context, uploader};

/// Arguments for the start command.
#[derive(Args, Debug)]
pub struct StartArgs {}

/// Run the start command.
pub async fn run(_args: StartArgs, ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;
    let uploader = uploader(&config);

    if ctx.verbose {
        println!("Loaded config: {}", ctx.config_path.display());
        println!("Upload command: {}", config.daemon.upload.command);
        println!("Temp dir: {}", config.daemon.effective_temp_dir().display());
    }

    let supervisor = Supervisor::new(config, uploader);
    supervisor.start().await?;

    let status = supervisor.status();
    println!(
        "mva running: {} directories, {} schedules (Ctrl-C to stop)",
        status.sessions, status.schedules
    );
    for session in supervisor.sessions().iter() {
        let dir = session.config();
        println!(
            "  {} [{}] → {}",
            dir.path.display(),
            dir.schedule,
            dir.destination
        );
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    println!();
    println!("Stopping, waiting for in-flight archives...");
    info!("interrupt received");
    supervisor.stop().await?;
    println!("Stopped");

    Ok(())
}
