//! Port sources.
//!
//! A port's source comes from exactly one origin: a local tarball, a git
//! remote, or a local directory. The manifest form ([`SourceOptions`]) has
//! one optional field per origin; converting it into a [`SourceSpec`] is the
//! only place the "exactly one" rule is checked.

pub mod archive;
pub mod git;
pub mod path;
pub mod provider;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::util::config::ConfigError;
use crate::util::process::ProcessError;

pub use git::{set_network_timeouts, Git2Cloner, GitCloner};
pub use provider::{Acquisition, SourceProvider};

/// Errors acquiring source code.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum SourceError {
    #[error("source archive does not exist: {}", .0.display())]
    #[diagnostic(code(ndkports::source::missing_archive))]
    MissingArchive(PathBuf),

    #[error("failed to extract {}", .archive.display())]
    #[diagnostic(code(ndkports::source::extract_failed))]
    ExtractFailed {
        archive: PathBuf,
        #[source]
        source: ProcessError,
    },

    #[error("failed to clone {url}: {message}")]
    #[diagnostic(
        code(ndkports::source::clone_failed),
        help("Check the remote URL and that the branch exists")
    )]
    CloneFailed { url: String, message: String },

    #[error("timed out cloning {url} after {secs}s")]
    #[diagnostic(
        code(ndkports::source::clone_timed_out),
        help("Raise `git-timeout` in the [net] table of .ndkports/config.toml")
    )]
    CloneTimedOut { url: String, secs: u64 },

    #[error("source directory does not exist: {}", .0.display())]
    #[diagnostic(code(ndkports::source::missing_directory))]
    MissingDirectory(PathBuf),

    #[error("expected directory: {} is not a directory", .0.display())]
    #[diagnostic(code(ndkports::source::not_a_directory))]
    NotADirectory(PathBuf),
}

/// A git remote and the branch (or tag) to check out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitSourceArgs {
    pub url: String,
    pub branch: String,
}

/// `[source]` as written in `Port.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceOptions {
    pub tar: Option<PathBuf>,
    pub git: Option<GitSourceArgs>,
    pub path: Option<PathBuf>,
}

/// A validated source origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// A tarball whose single top-level directory is stripped on extraction.
    Archive(PathBuf),
    Git(GitSourceArgs),
    /// A directory whose contents are copied.
    Directory(PathBuf),
}

impl SourceSpec {
    /// Resolve relative paths against `base`.
    pub fn relative_to(self, base: &Path) -> SourceSpec {
        match self {
            SourceSpec::Archive(p) => SourceSpec::Archive(base.join(p)),
            SourceSpec::Directory(p) => SourceSpec::Directory(base.join(p)),
            git => git,
        }
    }

    /// Short name of the origin for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceSpec::Archive(_) => "tar",
            SourceSpec::Git(_) => "git",
            SourceSpec::Directory(_) => "path",
        }
    }
}

impl TryFrom<&SourceOptions> for SourceSpec {
    type Error = ConfigError;

    fn try_from(options: &SourceOptions) -> Result<Self, Self::Error> {
        let mut set = Vec::new();
        if options.tar.is_some() {
            set.push("tar");
        }
        if options.git.is_some() {
            set.push("git");
        }
        if options.path.is_some() {
            set.push("path");
        }
        if set.len() > 1 {
            return Err(ConfigError::AmbiguousSource { origins: set });
        }

        if let Some(ref tar) = options.tar {
            return Ok(SourceSpec::Archive(tar.clone()));
        }
        if let Some(ref git) = options.git {
            validate_git_url(&git.url)?;
            return Ok(SourceSpec::Git(git.clone()));
        }
        if let Some(ref path) = options.path {
            return Ok(SourceSpec::Directory(path.clone()));
        }
        Err(ConfigError::NoSource)
    }
}

/// URLs with a scheme must parse; scp-like remotes (`git@host:repo`) are passed through.
fn validate_git_url(url: &str) -> Result<(), ConfigError> {
    if url.trim().is_empty() {
        return Err(ConfigError::InvalidGitUrl {
            url: url.to_string(),
            reason: "empty URL".to_string(),
        });
    }
    if url.contains("://") {
        Url::parse(url).map_err(|e| ConfigError::InvalidGitUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git() -> GitSourceArgs {
        GitSourceArgs {
            url: "https://github.com/madler/zlib.git".to_string(),
            branch: "v1.2.13".to_string(),
        }
    }

    #[test]
    fn test_single_origin() {
        let options = SourceOptions {
            tar: Some(PathBuf::from("src.tar.gz")),
            ..Default::default()
        };
        assert_eq!(
            SourceSpec::try_from(&options).unwrap(),
            SourceSpec::Archive(PathBuf::from("src.tar.gz"))
        );

        let options = SourceOptions {
            git: Some(git()),
            ..Default::default()
        };
        assert_eq!(SourceSpec::try_from(&options).unwrap(), SourceSpec::Git(git()));
    }

    #[test]
    fn test_ambiguous_source() {
        let options = SourceOptions {
            tar: Some(PathBuf::from("src.tar.gz")),
            git: Some(git()),
            path: Some(PathBuf::from("raw")),
        };
        match SourceSpec::try_from(&options) {
            Err(ConfigError::AmbiguousSource { origins }) => {
                assert_eq!(origins, vec!["tar", "git", "path"])
            }
            other => panic!("expected ambiguous source, got {:?}", other),
        }
    }

    #[test]
    fn test_no_source() {
        assert!(matches!(
            SourceSpec::try_from(&SourceOptions::default()),
            Err(ConfigError::NoSource)
        ));
    }

    #[test]
    fn test_invalid_git_url() {
        let options = SourceOptions {
            git: Some(GitSourceArgs {
                url: "https://exa mple.com/repo".to_string(),
                branch: "main".to_string(),
            }),
            ..Default::default()
        };
        assert!(matches!(
            SourceSpec::try_from(&options),
            Err(ConfigError::InvalidGitUrl { .. })
        ));

        let scp = SourceOptions {
            git: Some(GitSourceArgs {
                url: "git@github.com:google/googletest.git".to_string(),
                branch: "main".to_string(),
            }),
            ..Default::default()
        };
        assert!(SourceSpec::try_from(&scp).is_ok());
    }

    #[test]
    fn test_relative_to() {
        let spec = SourceSpec::Directory(PathBuf::from("vendor/lib")).relative_to(Path::new("/port"));
        assert_eq!(spec, SourceSpec::Directory(PathBuf::from("/port/vendor/lib")));
    }
}
