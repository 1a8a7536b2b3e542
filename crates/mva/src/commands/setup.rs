//! Setup-directories command - creates every configured watch directory.

use anyhow::{Context as _, Result};
use clap::Args;
use console::Style;

use super::Context;

/// Arguments for the setup-directories command.
#[derive(Args, Debug)]
pub struct SetupArgs {}

/// Run the setup-directories command.
pub async fn run(_args: SetupArgs, ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;
    let green = Style::new().green();

    for dir in &config.directories {
        tokio::fs::create_dir_all(&dir.path)
            .await
            .with_context(|| format!("Failed to create {}", dir.path.display()))?;
        println!(
            "{} Created watch directory: {}",
            green.apply_to("✓"),
            dir.path.display()
        );
    }

    Ok(())
}
