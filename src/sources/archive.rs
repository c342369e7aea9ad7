//! Tarball sources.

use std::path::Path;

use anyhow::Result;

use crate::sources::SourceError;
use crate::util::fs::{ensure_dir, normalize_path};
use crate::util::process::{CommandRunner, ProcessBuilder, ProcessError};

/// Build the `tar` invocation that unpacks `archive` into `target`,
/// dropping the archive's top-level directory.
pub fn tar_command(archive: &Path, target: &Path) -> ProcessBuilder {
    ProcessBuilder::new("tar")
        .arg("xf")
        .arg(archive)
        .arg("--strip-components=1")
        .cwd(target)
}

/// Extract `archive` into `target` with the system `tar`.
pub fn extract(runner: &dyn CommandRunner, archive: &Path, target: &Path) -> Result<()> {
    if !archive.is_file() {
        return Err(SourceError::MissingArchive(archive.to_path_buf()).into());
    }

    // tar runs inside the target, so the archive path must not be relative
    let archive = normalize_path(archive);
    ensure_dir(target)?;

    tracing::info!("Extracting {}", archive.display());
    let cmd = tar_command(&archive, target);
    let output = runner.run(&cmd)?;
    if !output.success() {
        return Err(SourceError::ExtractFailed {
            archive,
            source: ProcessError {
                command: cmd.display_command(),
                code: output.code,
                output: output.output,
            },
        }
        .into());
    }

    Ok(())
}
