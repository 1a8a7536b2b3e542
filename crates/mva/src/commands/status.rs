//! Status command - shows configuration and pending files.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde::Serialize;

use super::Context;

/// Arguments for the status command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output as JSON (for scripting)
    #[arg(long)]
    pub json: bool,
}

/// Status response for JSON output.
#[derive(Debug, Serialize)]
struct StatusOutput {
    config_path: PathBuf,
    directories: Vec<DirectoryStatus>,
}

#[derive(Debug, Serialize)]
struct DirectoryStatus {
    directory: PathBuf,
    schedule: String,
    format: String,
    compression: String,
    destination: String,
    /// `None` when the directory does not exist yet.
    pending_files: Option<usize>,
}

/// Run the status command.
pub async fn run(args: StatusArgs, ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;

    let mut directories = Vec::with_capacity(config.directories.len());
    for dir in &config.directories {
        let pending_files = mva_daemon::list_regular_files(&dir.path)
            .await
            .ok()
            .map(|files| files.len());
        directories.push(DirectoryStatus {
            directory: dir.path.clone(),
            schedule: dir.schedule.clone(),
            format: dir.naming_template.clone(),
            compression: dir.compression.clone(),
            destination: dir.destination.clone(),
            pending_files,
        });
    }

    let output = StatusOutput {
        config_path: ctx.config_path.clone(),
        directories,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let yellow = Style::new().yellow();

    println!();
    println!("{}", style("mva Configuration").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    println!(
        "  {} {}",
        dim.apply_to("Config file:"),
        output.config_path.display()
    );

    for dir in &output.directories {
        println!();
        println!("  {}", style(dir.directory.display()).bold());
        println!("    {} {}", dim.apply_to("Schedule:"), dir.schedule);
        println!("    {} {}", dim.apply_to("Format:"), dir.format);
        println!("    {} {}", dim.apply_to("Compression:"), dir.compression);
        println!("    {} {}", dim.apply_to("Destination:"), dir.destination);
        match dir.pending_files {
            Some(n) => println!("    {} {}", dim.apply_to("Pending:"), n),
            None => println!(
                "    {} {}",
                dim.apply_to("Pending:"),
                yellow.apply_to("directory missing (run: mva setup-directories)")
            ),
        }
    }
    println!();

    Ok(())
}
