//! Per-ABI build context handed to port backends.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::core::abi::Abi;
use crate::core::manifest::EnvMap;
use crate::core::ndk::Toolchain;
use crate::util::config::BuildConfig;
use crate::util::process::resolve_tool;

/// Host build tools used by the reference backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTools {
    pub cmake: PathBuf,
    pub ninja: PathBuf,
    pub meson: PathBuf,
    pub make: PathBuf,
}

impl BuildTools {
    /// Configured paths win; anything else is looked up on PATH.
    pub fn from_config(config: &BuildConfig) -> Self {
        BuildTools {
            cmake: resolve_tool(config.cmake.as_deref(), "cmake"),
            ninja: resolve_tool(config.ninja.as_deref(), "ninja"),
            meson: resolve_tool(config.meson.as_deref(), "meson"),
            make: resolve_tool(config.make.as_deref(), "make"),
        }
    }
}

impl Default for BuildTools {
    fn default() -> Self {
        BuildTools {
            cmake: PathBuf::from("cmake"),
            ninja: PathBuf::from("ninja"),
            meson: PathBuf::from("meson"),
            make: PathBuf::from("make"),
        }
    }
}

/// Everything a backend needs to build one ABI.
#[derive(Debug, Clone)]
pub struct PortContext {
    /// Toolchain for this ABI at the adjusted API level.
    pub toolchain: Toolchain,

    /// `build/port`, shared by every ABI.
    pub work_dir: PathBuf,

    /// Extracted sources.
    pub source_dir: PathBuf,

    /// `build/port/build/<abi>`.
    pub build_dir: PathBuf,

    /// `build/port/install/<abi>`.
    pub install_dir: PathBuf,

    /// Generated dependency sysroot for this ABI's triple.
    pub sysroot: PathBuf,

    /// Parallel jobs for make based builds.
    pub jobs: usize,

    pub tools: BuildTools,
}

impl PortContext {
    pub fn abi(&self) -> Abi {
        self.toolchain.abi
    }

    pub fn api(&self) -> u32 {
        self.toolchain.api
    }

    /// Substitute `{placeholder}`s in a manifest-supplied argument.
    ///
    /// Recognized: `{source}`, `{build}`, `{install}`, `{sysroot}`, `{ndk}`,
    /// `{abi}`, `{api}`, `{triple}`, `{jobs}` and `{toolchain-bin}`.
    pub fn expand(&self, value: &str) -> String {
        if !value.contains('{') {
            return value.to_string();
        }
        let replacements = [
            ("{source}", self.source_dir.display().to_string()),
            ("{build}", self.build_dir.display().to_string()),
            ("{install}", self.install_dir.display().to_string()),
            ("{sysroot}", self.sysroot.display().to_string()),
            ("{ndk}", self.toolchain.ndk.path().display().to_string()),
            ("{abi}", self.abi().abi_name().to_string()),
            ("{api}", self.api().to_string()),
            ("{triple}", self.toolchain.binutils_triple.to_string()),
            ("{jobs}", self.jobs.to_string()),
            ("{toolchain-bin}", self.toolchain.bin_dir.display().to_string()),
        ];
        replacements
            .iter()
            .fold(value.to_string(), |acc, (key, with)| acc.replace(key, with))
    }

    pub fn expand_args(&self, args: &[String]) -> Vec<String> {
        args.iter().map(|arg| self.expand(arg)).collect()
    }

    pub fn expand_env(&self, env: &EnvMap) -> Vec<(String, String)> {
        env.iter()
            .map(|(key, value)| (key.clone(), self.expand(value)))
            .collect()
    }

    /// `PATH` with the NDK toolchain binaries first.
    pub fn toolchain_path(&self) -> OsString {
        let mut paths = vec![self.toolchain.bin_dir.clone()];
        if let Some(existing) = std::env::var_os("PATH") {
            paths.extend(std::env::split_paths(&existing));
        }
        std::env::join_paths(paths).unwrap_or_else(|_| self.toolchain.bin_dir.clone().into())
    }

    /// Compiler and binutils variables for configure-style builds.
    pub fn toolchain_env(&self) -> Vec<(String, OsString)> {
        let tc = &self.toolchain;
        vec![
            ("AR".to_string(), tc.ar.clone().into()),
            ("CC".to_string(), tc.clang.clone().into()),
            ("CXX".to_string(), tc.clangxx.clone().into()),
            ("RANLIB".to_string(), tc.ranlib.clone().into()),
            ("STRIP".to_string(), tc.strip.clone().into()),
            ("PATH".to_string(), self.toolchain_path()),
        ]
    }
}
