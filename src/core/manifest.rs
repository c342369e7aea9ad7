//! Port.toml manifest parsing and schema.
//!
//! One manifest describes one port:
//!
//! ```toml
//! [package]
//! name = "curl"
//! version = "7.79.1"
//! min-sdk-version = 21
//!
//! [source]
//! tar = "curl-7.79.1.tar.gz"
//!
//! [[module]]
//! name = "curl"
//! dependencies = ["//openssl:crypto", "//openssl:ssl"]
//!
//! [dependencies]
//! openssl = { path = "../openssl" }
//!
//! [build]
//! backend = "autoconf"
//! args = ["--with-ssl"]
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::abi::Abi;
use crate::core::configuration::{DeclaredDependency, DependencyOrigin};
use crate::core::version::CMakeCompatibleVersion;
use crate::sources::{SourceOptions, SourceSpec};
use crate::util::config::ConfigError;

/// Prefix of the Android package id written to `AndroidManifest.xml`.
pub const PACKAGE_ID_PREFIX: &str = "com.android.ndk.thirdparty";

/// `min-sdk-version` used when `[package]` does not declare one.
pub const DEFAULT_MIN_SDK_VERSION: u32 = 21;

/// `[package]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PackageSection {
    pub name: String,

    /// Upstream version, free-form.
    pub version: String,

    /// Version recorded in `prefab.json`. Must be CMake compatible; when
    /// unset, `version` is parsed instead.
    #[serde(default)]
    pub cmake_version: Option<CMakeCompatibleVersion>,

    /// License file, relative to the source directory.
    #[serde(default = "default_license")]
    pub license: String,

    #[serde(default = "default_min_sdk_version")]
    pub min_sdk_version: u32,

    #[serde(default = "default_abis")]
    pub abis: Vec<Abi>,
}

fn default_license() -> String {
    "LICENSE".to_string()
}

fn default_min_sdk_version() -> u32 {
    DEFAULT_MIN_SDK_VERSION
}

fn default_abis() -> Vec<Abi> {
    Abi::ALL.to_vec()
}

/// `[[module]]`: one library exported by the package.
///
/// The installed library must be named `lib<name>.so`, or `lib<name>.a` for
/// static modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ModuleDescription {
    pub name: String,

    #[serde(default, rename = "static")]
    pub static_: bool,

    #[serde(default)]
    pub header_only: bool,

    /// Expose a different header set per ABI. Not supported by the packager.
    #[serde(default)]
    pub includes_per_abi: bool,

    /// Prefab references (`//pkg:module` or `:module`) to export.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl ModuleDescription {
    pub fn named(name: impl Into<String>) -> Self {
        ModuleDescription {
            name: name.into(),
            static_: false,
            header_only: false,
            includes_per_abi: false,
            dependencies: Vec::new(),
        }
    }

    /// File name of the installed library.
    pub fn library_file_name(&self) -> String {
        let extension = if self.static_ { "a" } else { "so" };
        format!("lib{}.{}", self.name, extension)
    }
}

/// A `[dependencies]` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencySpec {
    /// Another port project.
    pub path: Option<PathBuf>,
    /// A prebuilt archive.
    pub archive: Option<PathBuf>,
}

/// Environment for build commands.
pub type EnvMap = BTreeMap<String, String>;

/// `[build]` for the CMake backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CMakeOptions {
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: EnvMap,
}

/// `[build]` for the Meson backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct MesonOptions {
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_library")]
    pub default_library: String,
    #[serde(default)]
    pub env: EnvMap,
}

fn default_library() -> String {
    "shared".to_string()
}

/// `[build]` for the Autoconf backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AutoconfOptions {
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: EnvMap,
}

/// One command of an ad-hoc build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdHocCommand {
    pub cmd: Vec<String>,
    #[serde(default)]
    pub env: EnvMap,
}

/// `[build]` for ad-hoc command lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdHocOptions {
    #[serde(default)]
    pub run: Vec<AdHocCommand>,
}

/// `[build]`: which backend builds the port, and its options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum BuildSpec {
    #[serde(rename = "cmake")]
    CMake(CMakeOptions),
    Meson(MesonOptions),
    Autoconf(AutoconfOptions),
    #[serde(rename = "adhoc")]
    AdHoc(AdHocOptions),
}

impl Default for BuildSpec {
    fn default() -> Self {
        BuildSpec::CMake(CMakeOptions::default())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    package: PackageSection,

    #[serde(default)]
    source: SourceOptions,

    #[serde(default, rename = "module")]
    modules: Vec<ModuleDescription>,

    #[serde(default)]
    dependencies: BTreeMap<String, DependencySpec>,

    #[serde(default)]
    build: BuildSpec,
}

/// The parsed and validated Port.toml manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub package: PackageSection,
    pub source: SourceSpec,
    pub modules: Vec<ModuleDescription>,
    pub dependencies: Vec<DeclaredDependency>,
    pub build: BuildSpec,

    /// The directory containing this manifest
    pub manifest_dir: PathBuf,
}

impl Manifest {
    /// Load and validate a manifest from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;
        let manifest_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Manifest::parse(&text, path, &manifest_dir)?)
    }

    /// Parse manifest text. Relative paths resolve against `manifest_dir`.
    pub fn parse(text: &str, path: &Path, manifest_dir: &Path) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidManifest {
            path: path.to_path_buf(),
            message,
        };

        let raw: RawManifest = toml::from_str(text).map_err(|e| invalid(e.to_string()))?;

        let source = SourceSpec::try_from(&raw.source)?.relative_to(manifest_dir);

        if raw.package.name.trim().is_empty() {
            return Err(invalid("package name must not be empty".to_string()));
        }
        if raw.package.abis.is_empty() {
            return Err(invalid("at least one ABI is required".to_string()));
        }
        let mut seen_abis = BTreeSet::new();
        for abi in &raw.package.abis {
            if !seen_abis.insert(*abi) {
                return Err(invalid(format!("ABI `{}` listed twice", abi)));
            }
        }

        let modules = if raw.modules.is_empty() {
            vec![ModuleDescription::named(raw.package.name.clone())]
        } else {
            raw.modules
        };
        let mut seen_modules = BTreeSet::new();
        for module in &modules {
            if !seen_modules.insert(module.name.as_str()) {
                return Err(invalid(format!("module `{}` declared twice", module.name)));
            }
        }

        if let BuildSpec::AdHoc(options) = &raw.build {
            if options.run.iter().any(|run| run.cmd.is_empty()) {
                return Err(invalid("every [[build.run]] needs a non-empty `cmd`".to_string()));
            }
        }

        let mut dependencies = Vec::new();
        for (name, spec) in raw.dependencies {
            let origin = match (spec.path, spec.archive) {
                (Some(path), None) => DependencyOrigin::Project(manifest_dir.join(path)),
                (None, Some(archive)) => DependencyOrigin::Archive(manifest_dir.join(archive)),
                _ => {
                    return Err(invalid(format!(
                        "dependency `{}` must set exactly one of `path` or `archive`",
                        name
                    )))
                }
            };
            dependencies.push(DeclaredDependency { name, origin });
        }

        let manifest = Manifest {
            package: raw.package,
            source,
            modules,
            dependencies,
            build: raw.build,
            manifest_dir: manifest_dir.to_path_buf(),
        };
        manifest.cmake_version().map_err(|e| invalid(e.to_string()))?;

        Ok(manifest)
    }

    pub fn name(&self) -> &str {
        &self.package.name
    }

    pub fn version(&self) -> &str {
        &self.package.version
    }

    /// The version recorded in `prefab.json`.
    pub fn cmake_version(&self) -> Result<CMakeCompatibleVersion> {
        match self.package.cmake_version {
            Some(version) => Ok(version),
            None => CMakeCompatibleVersion::parse(&self.package.version).with_context(|| {
                format!(
                    "version `{}` is not CMake compatible; set `cmake-version` in [package]",
                    self.package.version
                )
            }),
        }
    }

    /// Android package id of the packaged archive.
    pub fn package_id(&self) -> String {
        format!("{}.{}", PACKAGE_ID_PREFIX, self.package.name)
    }

    pub fn abis(&self) -> &[Abi] {
        &self.package.abis
    }

    pub fn min_sdk_version(&self) -> u32 {
        self.package.min_sdk_version
    }
}
