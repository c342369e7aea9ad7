//! Local directory sources.

use std::path::Path;

use anyhow::Result;

use crate::sources::SourceError;
use crate::util::fs::copy_dir_all;

/// Copy the contents of `dir` into `target`, overwriting on conflict.
pub fn copy_directory(dir: &Path, target: &Path) -> Result<()> {
    if !dir.exists() {
        return Err(SourceError::MissingDirectory(dir.to_path_buf()).into());
    }
    if !dir.is_dir() {
        return Err(SourceError::NotADirectory(dir.to_path_buf()).into());
    }

    tracing::info!("Copying {}", dir.display());
    copy_dir_all(dir, target)
}
