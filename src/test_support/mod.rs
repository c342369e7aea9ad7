//! Test doubles and fixtures for ndkports unit tests.
//!
//! The port pipeline talks to the outside world through two seams,
//! [`CommandRunner`] for build tools and [`GitCloner`] for remotes. The
//! fakes here record every call so tests can assert on exact command lines
//! without a toolchain installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use ndkports::test_support::FakeRunner;
//!
//! let runner = FakeRunner::new();
//! run_port(&ctx.with_runner(&runner))?;
//! assert_eq!(runner.calls()[0].get_program(), Path::new("cmake"));
//! ```

pub mod fixtures;

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;

use crate::sources::{GitCloner, GitSourceArgs, SourceError};
use crate::util::process::{CommandRunner, ProcessBuilder, ProcessOutput};

pub use fixtures::*;

type Handler = Box<dyn Fn(&ProcessBuilder) -> ProcessOutput + Send + Sync>;

/// Command runner that records invocations instead of spawning them.
pub struct FakeRunner {
    calls: Mutex<Vec<ProcessBuilder>>,
    handler: Handler,
}

impl FakeRunner {
    /// Every command succeeds with no output.
    pub fn new() -> Self {
        Self::with_handler(|_| ProcessOutput {
            code: Some(0),
            output: String::new(),
        })
    }

    /// Every command exits with `code` and prints `output`.
    pub fn failing(code: i32, output: &str) -> Self {
        let output = output.to_string();
        Self::with_handler(move |_| ProcessOutput {
            code: Some(code),
            output: output.clone(),
        })
    }

    /// Decide each command's outcome with `handler`. The handler may also
    /// touch the filesystem to stand in for what the real tool would write.
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&ProcessBuilder) -> ProcessOutput + Send + Sync + 'static,
    {
        FakeRunner {
            calls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        }
    }

    /// Commands run so far, in order.
    pub fn calls(&self) -> Vec<ProcessBuilder> {
        self.calls.lock().unwrap().clone()
    }

    /// Programs run so far, by file name.
    pub fn programs(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|cmd| {
                cmd.get_program()
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            })
            .collect()
    }
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<ProcessOutput> {
        self.calls.lock().unwrap().push(cmd.clone());
        Ok((self.handler)(cmd))
    }
}

/// Git cloner that records requests and fakes a checkout.
#[derive(Debug, Default)]
pub struct FakeCloner {
    calls: Mutex<Vec<(GitSourceArgs, PathBuf, Duration)>>,
    failure: Option<String>,
}

impl FakeCloner {
    /// Clones succeed and leave a `README` in the destination.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clones fail with `message`.
    pub fn failing(message: &str) -> Self {
        FakeCloner {
            calls: Mutex::new(Vec::new()),
            failure: Some(message.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<(GitSourceArgs, PathBuf, Duration)> {
        self.calls.lock().unwrap().clone()
    }
}

impl GitCloner for FakeCloner {
    fn clone_branch(
        &self,
        remote: &GitSourceArgs,
        dest: &Path,
        timeout: Duration,
    ) -> Result<(), SourceError> {
        self.calls
            .lock()
            .unwrap()
            .push((remote.clone(), dest.to_path_buf(), timeout));

        if let Some(message) = &self.failure {
            return Err(SourceError::CloneFailed {
                url: remote.url.clone(),
                message: message.clone(),
            });
        }

        std::fs::create_dir_all(dest).unwrap();
        std::fs::write(dest.join("README"), &remote.branch).unwrap();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_runner_records_calls() {
        let runner = FakeRunner::failing(3, "boom");
        let out = runner
            .run(&ProcessBuilder::new("ninja").arg("-v"))
            .unwrap();

        assert_eq!(out.code, Some(3));
        assert_eq!(out.output, "boom");
        assert_eq!(runner.programs(), vec!["ninja"]);
        assert_eq!(runner.calls()[0].get_args(), ["-v".to_string()]);
    }

    #[test]
    fn test_fake_cloner_populates_dest() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cloner = FakeCloner::new();
        let remote = GitSourceArgs {
            url: "https://example.com/x.git".to_string(),
            branch: "main".to_string(),
        };

        cloner
            .clone_branch(&remote, &tmp.path().join("src"), Duration::from_secs(1))
            .unwrap();
        assert!(tmp.path().join("src/README").is_file());
        assert_eq!(cloner.calls().len(), 1);
    }
}
