//! The resolved dependency layout and prefab package reading.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::core::abi::Abi;
use crate::core::descriptor::{
    abi_from_dir_name, AbiMetadata, ModuleMetadata, PackageMetadata, ABI_METADATA_FILE,
    MODULES_DIR, MODULE_METADATA_FILE, PACKAGE_METADATA_FILE, PREFAB_DIR, SCHEMA_VERSION,
};
use crate::resolver::DescriptorError;

/// One module of a resolved package.
#[derive(Debug, Clone)]
pub struct ResolvedModule {
    pub name: String,
    pub metadata: ModuleMetadata,
    /// Per-ABI metadata, keyed by ABI. Empty for header-only modules.
    pub abis: BTreeMap<Abi, AbiMetadata>,
    /// `prefab/modules/<name>` inside the unpacked package.
    pub dir: PathBuf,
}

impl ResolvedModule {
    /// The ABIs this module ships libraries for.
    pub fn abi_set(&self) -> BTreeSet<Abi> {
        self.abis.keys().copied().collect()
    }

    /// The lowest API level across the module's ABIs.
    pub fn min_sdk_version(&self) -> Option<u32> {
        self.abis.values().map(|meta| meta.api).min()
    }

    pub fn is_header_only(&self) -> bool {
        self.metadata.header_only
    }

    pub fn include_dirs(&self) -> Vec<PathBuf> {
        self.metadata
            .include_dirs
            .iter()
            .map(|dir| self.dir.join(dir))
            .collect()
    }

    pub fn libs_dir(&self, abi: Abi) -> PathBuf {
        self.dir
            .join("libs")
            .join(crate::core::descriptor::abi_dir_name(abi))
    }

    /// The library file shipped for `abi`, if any.
    pub fn library_for(&self, abi: Abi) -> Option<PathBuf> {
        if !self.abis.contains_key(&abi) {
            return None;
        }
        let stem = self
            .metadata
            .library_name
            .clone()
            .unwrap_or_else(|| format!("lib{}", self.name));
        let dir = self.libs_dir(abi);
        ["so", "a"]
            .iter()
            .map(|ext| dir.join(format!("{}.{}", stem, ext)))
            .find(|path| path.is_file())
    }
}

/// One unpacked dependency package.
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    pub metadata: PackageMetadata,
    /// Root of the unpacked archive.
    pub root: PathBuf,
    /// Modules sorted by name.
    pub modules: Vec<ResolvedModule>,
}

impl ResolvedPackage {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn module(&self, name: &str) -> Option<&ResolvedModule> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Read an unpacked package. `label` names the package in errors.
    pub fn read(root: &Path, label: &str) -> Result<Self, DescriptorError> {
        let prefab = root.join(PREFAB_DIR);
        let metadata: PackageMetadata = read_json(&prefab.join(PACKAGE_METADATA_FILE), label)?;
        if metadata.schema_version != SCHEMA_VERSION {
            return Err(DescriptorError::UnsupportedSchema {
                package: label.to_string(),
                found: metadata.schema_version,
            });
        }

        let mut modules = Vec::new();
        let modules_dir = prefab.join(MODULES_DIR);
        for module_dir in sorted_subdirs(&modules_dir, label)? {
            modules.push(read_module(&module_dir, label)?);
        }

        Ok(ResolvedPackage {
            metadata,
            root: root.to_path_buf(),
            modules,
        })
    }
}

fn read_module(dir: &Path, label: &str) -> Result<ResolvedModule, DescriptorError> {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let metadata: ModuleMetadata = read_json(&dir.join(MODULE_METADATA_FILE), label)?;

    let mut abis = BTreeMap::new();
    let libs = dir.join("libs");
    if libs.is_dir() {
        for abi_dir in sorted_subdirs(&libs, label)? {
            let dir_name = abi_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let abi = abi_from_dir_name(&dir_name).ok_or_else(|| DescriptorError::Malformed {
                package: label.to_string(),
                path: abi_dir.clone(),
                message: format!("unknown ABI directory `{}`", dir_name),
            })?;
            let meta: AbiMetadata = read_json(&abi_dir.join(ABI_METADATA_FILE), label)?;
            if meta.abi != abi {
                return Err(DescriptorError::Malformed {
                    package: label.to_string(),
                    path: abi_dir.join(ABI_METADATA_FILE),
                    message: format!("declares ABI `{}` inside `{}`", meta.abi, dir_name),
                });
            }
            abis.insert(abi, meta);
        }
    }

    Ok(ResolvedModule {
        name,
        metadata,
        abis,
        dir: dir.to_path_buf(),
    })
}

fn read_json<T: DeserializeOwned>(path: &Path, label: &str) -> Result<T, DescriptorError> {
    let text = std::fs::read_to_string(path).map_err(|_| DescriptorError::MissingManifest {
        package: label.to_string(),
        path: path.to_path_buf(),
    })?;
    serde_json::from_str(&text).map_err(|e| DescriptorError::Malformed {
        package: label.to_string(),
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn sorted_subdirs(dir: &Path, label: &str) -> Result<Vec<PathBuf>, DescriptorError> {
    let entries = std::fs::read_dir(dir).map_err(|_| DescriptorError::MissingManifest {
        package: label.to_string(),
        path: dir.to_path_buf(),
    })?;
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// All packages resolved for one toolchain and API level.
#[derive(Debug, Clone)]
pub struct ResolvedLayout {
    pub root: PathBuf,
    /// Packages sorted by archive file name.
    pub packages: Vec<ResolvedPackage>,
}

impl ResolvedLayout {
    /// Where unpacked archives live.
    pub fn packages_dir(root: &Path) -> PathBuf {
        root.join("packages")
    }

    /// The generated sysroot shared by every ABI.
    pub fn generated_dir(&self) -> PathBuf {
        self.root.join("generated")
    }

    /// Sysroot for one ABI: `generated/<triple>` with `include` and `lib`.
    pub fn sysroot(&self, abi: Abi) -> PathBuf {
        self.generated_dir().join(abi.triple())
    }

    pub fn package(&self, name: &str) -> Option<&ResolvedPackage> {
        self.packages.iter().find(|p| p.name() == name)
    }

    /// Look up a module by package and module name.
    pub fn module(&self, package: &str, module: &str) -> Option<&ResolvedModule> {
        self.package(package).and_then(|p| p.module(module))
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
