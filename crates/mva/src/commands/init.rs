//! Init command - writes the default configuration.

use anyhow::Result;
use clap::Args;
use console::{Style, style};

use super::Context;

/// Arguments for the init command.
#[derive(Args, Debug)]
pub struct InitArgs {}

/// Run the init command.
pub async fn run(_args: InitArgs, ctx: &Context) -> Result<()> {
    let config = mva_config::init_config(&ctx.config_path)?;

    let green = Style::new().green();
    let dim = Style::new().dim();

    println!(
        "{} Created {}",
        green.apply_to("✓"),
        style(ctx.config_path.display()).bold()
    );
    println!();
    for dir in &config.directories {
        println!(
            "  {} → {}",
            dir.path.display(),
            dim.apply_to(&dir.destination)
        );
    }
    println!();
    println!(
        "  {}",
        dim.apply_to("Edit the file, then run: mva setup-directories && mva start")
    );

    Ok(())
}
