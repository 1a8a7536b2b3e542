//! Artifact construction from a staged file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use mva_config::CompressionKind;
use tracing::debug;

use crate::error::{ArchiveError, Result};

/// Turn the staged copy into the artifact that gets uploaded.
///
/// `staged` must live directly inside the task's temp directory and be named
/// with the rendered archive name. For [`CompressionKind::TarGz`] the staged
/// copy is replaced by `<name>.tar.gz` holding one entry called `<name>`; for
/// [`CompressionKind::None`] the staged copy is the artifact.
///
/// Blocking; run it on the blocking pool.
pub fn build_artifact(kind: CompressionKind, staged: &Path) -> Result<PathBuf> {
    match kind {
        CompressionKind::None => Ok(staged.to_path_buf()),
        CompressionKind::TarGz => {
            let artifact = artifact_path(kind, staged);
            write_tar_gz(staged, &artifact)?;
            std::fs::remove_file(staged)
                .map_err(|e| ArchiveError::io("remove staged copy", staged, e))?;
            debug!(artifact = %artifact.display(), "tarball written");
            Ok(artifact)
        }
    }
}

fn artifact_path(kind: CompressionKind, staged: &Path) -> PathBuf {
    let mut name = staged.file_name().unwrap_or_default().to_os_string();
    if let Some(suffix) = kind.artifact_suffix() {
        name.push(suffix);
    }
    staged.with_file_name(name)
}

fn write_tar_gz(source: &Path, output: &Path) -> Result<()> {
    let compression_err = |e: std::io::Error| ArchiveError::Compression {
        path: source.to_path_buf(),
        message: e.to_string(),
    };

    let entry_name = source
        .file_name()
        .ok_or_else(|| ArchiveError::Compression {
            path: source.to_path_buf(),
            message: "staged file has no name".to_string(),
        })?;

    let file = File::create(output).map_err(|e| ArchiveError::io("create", output, e))?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    builder
        .append_path_with_name(source, entry_name)
        .map_err(compression_err)?;

    let encoder = builder.into_inner().map_err(compression_err)?;
    let mut writer = encoder.finish().map_err(compression_err)?;
    writer.flush().map_err(compression_err)?;

    Ok(())
}
