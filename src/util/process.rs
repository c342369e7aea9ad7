//! Subprocess execution utilities.
//!
//! Everything that shells out goes through [`CommandRunner`], so tests can
//! substitute a recorder for the real process table.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use thiserror::Error;

/// A subprocess that exited unsuccessfully.
#[derive(Debug, Error, miette::Diagnostic)]
#[error("`{command}` failed with exit code {code:?}\n{output}")]
#[diagnostic(
    code(ndkports::process::failed),
    help("The captured output above comes from the failing tool")
)]
pub struct ProcessError {
    pub command: String,
    pub code: Option<i32>,
    pub output: String,
}

/// Builder for subprocess execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<OsStr>) -> Self {
        self.env.insert(
            key.as_ref().to_string(),
            value.as_ref().to_string_lossy().into_owned(),
        );
        self
    }

    /// Set several environment variables.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<OsStr>,
    {
        for (key, value) in vars {
            self = self.env(key, value);
        }
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    pub fn get_program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(&self.env);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Result of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` if terminated by a signal.
    pub code: Option<i32>,
    /// stdout and stderr, interleaved as written.
    pub output: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs subprocesses.
pub trait CommandRunner: Send + Sync {
    /// Run `cmd` to completion. A non-zero exit is not an error here.
    fn run(&self, cmd: &ProcessBuilder) -> Result<ProcessOutput>;

    /// Run `cmd` and fail with a [`ProcessError`] unless it exits with 0.
    fn run_checked(&self, cmd: &ProcessBuilder) -> Result<ProcessOutput> {
        tracing::debug!("Running `{}`", cmd.display_command());
        let output = self.run(cmd)?;
        if !output.success() {
            return Err(ProcessError {
                command: cmd.display_command(),
                code: output.code,
                output: output.output,
            }
            .into());
        }
        Ok(output)
    }
}

/// Runs commands on the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    /// stdout and stderr share one file handle, so the captured output keeps
    /// the order the tool wrote it in.
    fn run(&self, cmd: &ProcessBuilder) -> Result<ProcessOutput> {
        let mut log = tempfile::tempfile().context("failed to create output capture file")?;
        let status = cmd
            .build_command()
            .stdin(Stdio::null())
            .stdout(Stdio::from(log.try_clone()?))
            .stderr(Stdio::from(log.try_clone()?))
            .status()
            .with_context(|| format!("failed to spawn `{}`", cmd.get_program().display()))?;

        let mut bytes = Vec::new();
        log.seek(SeekFrom::Start(0))?;
        log.read_to_end(&mut bytes)?;

        Ok(ProcessOutput {
            code: status.code(),
            output: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Resolve a tool, preferring an explicitly configured path.
pub fn resolve_tool(configured: Option<&Path>, name: &str) -> PathBuf {
    configured
        .map(Path::to_path_buf)
        .or_else(|| find_executable(name))
        .unwrap_or_else(|| PathBuf::from(name))
}
