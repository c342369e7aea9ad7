//! NDK installation and per-ABI toolchain paths.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::abi::Abi;
use crate::core::version::NdkVersion;
use crate::util::hash::Fingerprint;

/// An NDK installation on disk.
#[derive(Debug, Clone)]
pub struct Ndk {
    path: PathBuf,
    version: NdkVersion,
}

impl Ndk {
    /// Open the NDK at `path`, reading its version from `source.properties`.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            bail!("NDK path is not a directory: {}", path.display());
        }

        let properties = path.join("source.properties");
        let text = std::fs::read_to_string(&properties)
            .with_context(|| format!("failed to read {}", properties.display()))?;
        let version = NdkVersion::from_source_properties(&text)
            .with_context(|| format!("failed to parse {}", properties.display()))?;

        Ok(Ndk {
            path: path.to_path_buf(),
            version,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> &NdkVersion {
        &self.version
    }

    /// `toolchains/llvm/prebuilt/<host>`.
    pub fn toolchain_directory(&self) -> PathBuf {
        let prebuilt = self.path.join("toolchains").join("llvm").join("prebuilt");
        prebuilt.join(host_tag(&prebuilt))
    }

    pub fn toolchain_bin_directory(&self) -> PathBuf {
        self.toolchain_directory().join("bin")
    }

    pub fn sysroot_directory(&self) -> PathBuf {
        self.toolchain_directory().join("sysroot")
    }

    /// The CMake toolchain file shipped with the NDK.
    pub fn cmake_toolchain_file(&self) -> PathBuf {
        self.path
            .join("build")
            .join("cmake")
            .join("android.toolchain.cmake")
    }

    /// Short identity used to namespace outputs that depend on the toolchain.
    pub fn identity(&self) -> String {
        let mut fp = Fingerprint::new();
        fp.update_str(&self.path.to_string_lossy());
        fp.update_str(&self.version.to_string());
        format!("ndk-{}-{}", self.version.major, fp.finish_prefix(8))
    }
}

/// Pick the prebuilt host directory, preferring whatever the NDK actually ships.
fn host_tag(prebuilt: &Path) -> String {
    if let Ok(entries) = std::fs::read_dir(prebuilt) {
        let mut dirs: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        dirs.sort();
        if let Some(first) = dirs.into_iter().next() {
            return first;
        }
    }

    let os = match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    };
    format!("{}-x86_64", os)
}

/// Tool paths for building one ABI at one API level.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub ndk: Ndk,
    pub abi: Abi,
    pub api: u32,
    pub binutils_triple: &'static str,
    pub sysroot_libs: PathBuf,
    pub bin_dir: PathBuf,
    pub ar: PathBuf,
    pub clang: PathBuf,
    pub clangxx: PathBuf,
    pub nm: PathBuf,
    pub objdump: PathBuf,
    pub ranlib: PathBuf,
    pub readelf: PathBuf,
    pub strip: PathBuf,
}

impl Toolchain {
    pub fn new(ndk: &Ndk, abi: Abi, api: u32) -> Self {
        let binutils_triple = abi.triple();
        let clang_triple = match abi {
            Abi::Arm => format!("armv7a-linux-androideabi{}", api),
            _ => format!("{}{}", binutils_triple, api),
        };

        let bin_dir = ndk.toolchain_bin_directory();
        let tool = |name: &str| bin_dir.join(name);

        Toolchain {
            ndk: ndk.clone(),
            abi,
            api,
            binutils_triple,
            sysroot_libs: ndk.sysroot_directory().join("usr/lib").join(binutils_triple),
            ar: tool("llvm-ar"),
            clang: tool(&format!("{}-clang", clang_triple)),
            clangxx: tool(&format!("{}-clang++", clang_triple)),
            nm: tool("llvm-nm"),
            objdump: tool("llvm-objdump"),
            ranlib: tool("llvm-ranlib"),
            readelf: tool("llvm-readelf"),
            strip: tool("llvm-strip"),
            bin_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fake_ndk;
    use tempfile::TempDir;

    #[test]
    fn test_open_reads_version() {
        let tmp = TempDir::new().unwrap();
        let ndk = Ndk::open(&fake_ndk(tmp.path(), "25.2.9519653")).unwrap();
        assert_eq!(ndk.version().major, 25);
        assert!(ndk.identity().starts_with("ndk-25-"));
    }

    #[test]
    fn test_open_missing_source_properties() {
        let tmp = TempDir::new().unwrap();
        let err = Ndk::open(tmp.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("source.properties"));
    }

    #[test]
    fn test_toolchain_paths() {
        let tmp = TempDir::new().unwrap();
        let ndk = Ndk::open(&fake_ndk(tmp.path(), "25.2.9519653")).unwrap();

        let arm = Toolchain::new(&ndk, Abi::Arm, 21);
        assert!(arm.clang.ends_with("armv7a-linux-androideabi21-clang"));
        assert_eq!(arm.binutils_triple, "arm-linux-androideabi");

        let x64 = Toolchain::new(&ndk, Abi::X86_64, 24);
        assert!(x64.clangxx.ends_with("x86_64-linux-android24-clang++"));
        assert!(x64.sysroot_libs.ends_with("usr/lib/x86_64-linux-android"));
        assert!(x64.ar.ends_with("llvm-ar"));
    }
}
