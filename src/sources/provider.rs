//! The source provider: populates a port's working source directory.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::sources::git::GitCloner;
use crate::sources::{archive, path, SourceSpec};
use crate::util::config::DEFAULT_GIT_TIMEOUT_SECS;
use crate::util::diagnostic::suggestions;
use crate::util::fs::is_non_empty_dir;
use crate::util::process::CommandRunner;

/// Outcome of [`SourceProvider::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    /// Source was written to the target directory.
    Fetched,
    /// The target directory already had content; nothing was done.
    UpToDate,
}

/// Acquires source through the process and git seams it is given.
pub struct SourceProvider<'a> {
    runner: &'a dyn CommandRunner,
    cloner: &'a dyn GitCloner,
    git_timeout: Duration,
}

impl<'a> SourceProvider<'a> {
    pub fn new(runner: &'a dyn CommandRunner, cloner: &'a dyn GitCloner) -> Self {
        SourceProvider {
            runner,
            cloner,
            git_timeout: Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS),
        }
    }

    pub fn with_git_timeout(mut self, timeout: Duration) -> Self {
        self.git_timeout = timeout;
        self
    }

    /// Populate `target` from `spec`.
    ///
    /// A non-empty `target` is taken as already acquired and left alone.
    /// Nothing is cleaned up on failure.
    pub fn acquire(&self, spec: &SourceSpec, target: &Path) -> Result<Acquisition> {
        if is_non_empty_dir(target) {
            tracing::info!(
                "Source already present in {}. {}",
                target.display(),
                suggestions::STALE_SOURCE
            );
            return Ok(Acquisition::UpToDate);
        }

        match spec {
            SourceSpec::Archive(tarball) => archive::extract(self.runner, tarball, target),
            SourceSpec::Git(remote) => self
                .cloner
                .clone_branch(remote, target, self.git_timeout)
                .map_err(Into::into),
            SourceSpec::Directory(dir) => path::copy_directory(dir, target),
        }
        .with_context(|| format!("failed to acquire {} source", spec.kind()))?;

        Ok(Acquisition::Fetched)
    }
}
