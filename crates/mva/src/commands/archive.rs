//! Archive command - one-shot archiving of explicit files.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Args;
use console::Style;
use mva_archive::{ArchivePipeline, ArchiveTask, PipelineConfig, Trigger};

use super::{Context, uploader};

/// Arguments for the archive command.
#[derive(Args, Debug)]
pub struct ArchiveArgs {
    /// Files to archive
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<PathBuf>,

    /// Destination name from the config (e.g. gdrive:archive)
    #[arg(short, long)]
    pub destination: String,
}

/// Run the archive command.
///
/// Every file is attempted; the command fails at the end if any of them
/// was missing or failed to archive.
pub async fn run(args: ArchiveArgs, ctx: &Context) -> Result<()> {
    let config = ctx.load_config()?;
    let directory = Arc::new(config.find_destination(&args.destination)?.clone());

    let pipeline = ArchivePipeline::new(
        PipelineConfig {
            temp_root: config.daemon.effective_temp_dir(),
        },
        uploader(&config),
    );

    let green = Style::new().green();
    let red = Style::new().red();

    let mut failed = 0usize;
    for file in &args.files {
        let path = std::path::absolute(file).unwrap_or_else(|_| file.clone());
        if !path.is_file() {
            eprintln!("{} File not found: {}", red.apply_to("✗"), file.display());
            failed += 1;
            continue;
        }

        let task = ArchiveTask::new(&path, directory.clone(), Trigger::Manual);
        match pipeline.archive(&task).await {
            Ok(receipt) => println!(
                "{} Archived: {} → {}/{}",
                green.apply_to("✓"),
                file.display(),
                receipt.destination,
                receipt.artifact_name
            ),
            Err(e) => {
                eprintln!("{} {}: {}", red.apply_to("✗"), file.display(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} files were not archived", failed, args.files.len());
    }
    Ok(())
}
