//! Configuration file support for ndkports.
//!
//! ndkports supports two configuration file locations:
//! - Global: `~/.ndkports/config.toml` - User-wide defaults
//! - Project: `.ndkports/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config. The NDK path is
//! resolved across all layers, see [`resolve_ndk_path`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default timeout for network operations on git remotes.
pub const DEFAULT_GIT_TIMEOUT_SECS: u64 = 60;

/// Name of the Android Studio style properties file consulted last.
pub const LOCAL_PROPERTIES: &str = "local.properties";

/// Environment variable naming the NDK.
pub const NDK_PATH_ENV: &str = "NDKPORTS_NDK_PATH";

/// Configuration errors raised before any build work happens.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum ConfigError {
    #[error("ambiguous source: only one of {} may be set", .origins.join(", "))]
    #[diagnostic(
        code(ndkports::config::ambiguous_source),
        help("Keep exactly one of `tar`, `git` or `path` in the [source] table of Port.toml")
    )]
    AmbiguousSource { origins: Vec<&'static str> },

    #[error("no source: one of tar, git or path must be set")]
    #[diagnostic(
        code(ndkports::config::no_source),
        help("Add a [source] table to Port.toml with `tar`, `git` or `path`")
    )]
    NoSource,

    #[error("invalid git remote `{url}`: {reason}")]
    #[diagnostic(code(ndkports::config::invalid_git_url))]
    InvalidGitUrl { url: String, reason: String },

    #[error("NDK path is not configured")]
    #[diagnostic(
        code(ndkports::config::missing_ndk),
        help("Pass --ndk-path, set NDKPORTS_NDK_PATH, add `[ndk] path` to .ndkports/config.toml, or set ndkPath in local.properties")
    )]
    MissingNdkPath,

    #[error("invalid manifest {}: {message}", .path.display())]
    #[diagnostic(code(ndkports::config::invalid_manifest))]
    InvalidManifest { path: PathBuf, message: String },
}

/// ndkports configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ndk: NdkConfig,
    pub build: BuildConfig,
    pub net: NetConfig,
}

/// NDK location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NdkConfig {
    pub path: Option<PathBuf>,
}

/// Build tool overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Path to cmake; looked up on PATH when unset.
    pub cmake: Option<PathBuf>,
    pub ninja: Option<PathBuf>,
    pub meson: Option<PathBuf>,
    pub make: Option<PathBuf>,

    /// Parallel jobs for make based builds (None = number of CPUs)
    pub jobs: Option<usize>,
}

/// Network-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NetConfig {
    /// Git clone timeout in seconds
    pub git_timeout: Option<u64>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.ndk.path.is_some() {
            self.ndk.path = other.ndk.path;
        }

        if other.build.cmake.is_some() {
            self.build.cmake = other.build.cmake;
        }
        if other.build.ninja.is_some() {
            self.build.ninja = other.build.ninja;
        }
        if other.build.meson.is_some() {
            self.build.meson = other.build.meson;
        }
        if other.build.make.is_some() {
            self.build.make = other.build.make;
        }
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }

        if other.net.git_timeout.is_some() {
            self.net.git_timeout = other.net.git_timeout;
        }
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.net.git_timeout.unwrap_or(DEFAULT_GIT_TIMEOUT_SECS))
    }

    pub fn jobs(&self) -> usize {
        self.build
            .jobs
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.ndkports/config.toml)
/// 2. Global config (~/.ndkports/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }
    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global ndkports config directory (~/.ndkports).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".ndkports"))
}

/// Get the global config path (~/.ndkports/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.ndkports/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".ndkports").join("config.toml")
}

/// Read `ndkPath` from a `local.properties` file, if present.
pub fn read_local_properties_ndk(project_root: &Path) -> Option<PathBuf> {
    let text = std::fs::read_to_string(project_root.join(LOCAL_PROPERTIES)).ok()?;
    text.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .find(|(key, _)| key.trim() == "ndkPath")
        .map(|(_, value)| PathBuf::from(value.trim()))
}

/// Resolve the NDK path.
///
/// Order of precedence (highest to lowest):
/// 1. Explicit path (`--ndk-path` or `NDKPORTS_NDK_PATH`)
/// 2. Merged config files (`[ndk] path`)
/// 3. `local.properties` (`ndkPath`)
pub fn resolve_ndk_path(
    explicit: Option<&Path>,
    config: &Config,
    project_root: &Path,
) -> Result<PathBuf, ConfigError> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| config.ndk.path.clone())
        .or_else(|| read_local_properties_ndk(project_root))
        .ok_or(ConfigError::MissingNdkPath)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[ndk]
path = "/opt/android-ndk"

[build]
cmake = "/opt/cmake/bin/cmake"
jobs = 8

[net]
git-timeout = 30
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.ndk.path, Some(PathBuf::from("/opt/android-ndk")));
        assert_eq!(config.build.cmake, Some(PathBuf::from("/opt/cmake/bin/cmake")));
        assert_eq!(config.jobs(), 8);
        assert_eq!(config.git_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert!(config.ndk.path.is_none());
        assert_eq!(config.git_timeout(), Duration::from_secs(60));
        assert!(config.jobs() >= 1);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.ndk.path = Some(PathBuf::from("/global/ndk"));
        base.build.jobs = Some(4);

        let mut project = Config::default();
        project.ndk.path = Some(PathBuf::from("/project/ndk"));

        base.merge(project);

        assert_eq!(base.ndk.path, Some(PathBuf::from("/project/ndk")));
        assert_eq!(base.build.jobs, Some(4));
    }

    #[test]
    fn test_load_config_layers() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.toml");
        let project = tmp.path().join("project.toml");
        std::fs::write(&global, "[ndk]\npath = \"/global\"\n[net]\ngit-timeout = 5\n").unwrap();
        std::fs::write(&project, "[ndk]\npath = \"/project\"\n").unwrap();

        let config = load_config(Some(&global), &project);
        assert_eq!(config.ndk.path, Some(PathBuf::from("/project")));
        assert_eq!(config.net.git_timeout, Some(5));
    }

    #[test]
    fn test_ndk_path_precedence() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(LOCAL_PROPERTIES),
            "# generated\nsdk.dir=/sdk\nndkPath=/from/local\n",
        )
        .unwrap();

        let mut config = Config::default();
        assert_eq!(
            resolve_ndk_path(None, &config, tmp.path()).unwrap(),
            PathBuf::from("/from/local")
        );

        config.ndk.path = Some(PathBuf::from("/from/config"));
        assert_eq!(
            resolve_ndk_path(None, &config, tmp.path()).unwrap(),
            PathBuf::from("/from/config")
        );

        assert_eq!(
            resolve_ndk_path(Some(Path::new("/from/cli")), &config, tmp.path()).unwrap(),
            PathBuf::from("/from/cli")
        );
    }

    #[test]
    fn test_missing_ndk_path() {
        let tmp = TempDir::new().unwrap();
        let err = resolve_ndk_path(None, &Config::default(), tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingNdkPath));
    }
}
