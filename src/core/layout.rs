//! On-disk layout of a port's build tree.
//!
//! ```text
//! build/port/
//!   src/                                   working source directory
//!   dependencies/<ndk>-api<N>/             resolved dependency layout
//!   build/<abi>/                           per-ABI build directories
//!   install/<abi-name>/{lib,include}       per-ABI install directories
//!   aar/                                   intermediate package tree
//!   outputs/<name>-<version>.aar           distributable archive
//!   publication.json                       exported variants
//! ```

use std::path::{Path, PathBuf};

use crate::core::abi::Abi;
use crate::core::configuration::PUBLICATION_FILE;
use crate::core::ndk::Ndk;

/// Paths under one port's `build/port` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortLayout {
    root: PathBuf,
}

impl PortLayout {
    /// Layout for the port whose manifest lives in `project_dir`.
    pub fn for_project(project_dir: &Path) -> Self {
        PortLayout {
            root: project_dir.join("build").join("port"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root.join("src")
    }

    pub fn dependencies_root(&self) -> PathBuf {
        self.root.join("dependencies")
    }

    /// Resolved dependency layout, namespaced by toolchain and API level.
    pub fn dependencies_dir(&self, ndk: &Ndk, min_sdk_version: u32) -> PathBuf {
        self.dependencies_root()
            .join(format!("{}-api{}", ndk.identity(), min_sdk_version))
    }

    pub fn build_dir(&self, abi: Abi) -> PathBuf {
        self.root.join("build").join(abi.abi_name())
    }

    pub fn install_root(&self) -> PathBuf {
        self.root.join("install")
    }

    pub fn install_dir(&self, abi: Abi) -> PathBuf {
        self.install_root().join(abi.abi_name())
    }

    pub fn package_dir(&self) -> PathBuf {
        self.root.join("aar")
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.root.join("outputs")
    }

    pub fn archive_path(&self, name: &str, version: &str) -> PathBuf {
        self.outputs_dir().join(format!("{}-{}.aar", name, version))
    }

    pub fn publication_path(&self) -> PathBuf {
        self.root.join(PUBLICATION_FILE)
    }
}
