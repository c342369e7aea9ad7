//! Reading a packaged archive back for `ndkports inspect`.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::abi::Abi;
use crate::resolver::{DescriptorError, ResolvedPackage};
use crate::util::archive::extract_zip;

/// Summary of one prefab package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageReport {
    pub name: String,
    pub version: Option<String>,
    pub dependencies: Vec<String>,
    pub modules: Vec<ModuleReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleReport {
    pub name: String,
    pub header_only: bool,
    #[serde(rename = "static")]
    pub static_: bool,
    pub export_libraries: Vec<String>,
    pub min_sdk_version: Option<u32>,
    pub abis: Vec<AbiReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbiReport {
    pub abi: Abi,
    pub api: u32,
    pub ndk: u32,
    pub stl: String,
}

impl From<&ResolvedPackage> for PackageReport {
    fn from(package: &ResolvedPackage) -> Self {
        let modules = package
            .modules
            .iter()
            .map(|module| ModuleReport {
                name: module.name.clone(),
                header_only: module.is_header_only(),
                static_: module.metadata.static_,
                export_libraries: module.metadata.export_libraries.clone(),
                min_sdk_version: module.min_sdk_version(),
                abis: module
                    .abis
                    .iter()
                    .map(|(&abi, meta)| AbiReport {
                        abi,
                        api: meta.api,
                        ndk: meta.ndk,
                        stl: meta.stl.clone(),
                    })
                    .collect(),
            })
            .collect();

        PackageReport {
            name: package.metadata.name.clone(),
            version: package.metadata.version.clone(),
            dependencies: package.metadata.dependencies.clone(),
            modules,
        }
    }
}

impl fmt::Display for PackageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(version) = &self.version {
            write!(f, " {}", version)?;
        }
        writeln!(f)?;
        if !self.dependencies.is_empty() {
            writeln!(f, "  dependencies: {}", self.dependencies.join(", "))?;
        }
        for module in &self.modules {
            let kind = if module.header_only {
                "header-only"
            } else if module.static_ {
                "static"
            } else {
                "shared"
            };
            writeln!(f, "  module {} ({})", module.name, kind)?;
            for abi in &module.abis {
                writeln!(f, "    {:<12} api {:<3} ndk r{} {}", abi.abi, abi.api, abi.ndk, abi.stl)?;
            }
        }
        Ok(())
    }
}

/// Read the package at `path`: an `.aar` archive, or an unpacked tree.
pub fn inspect(path: &Path) -> Result<PackageReport> {
    let label = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    if path.is_dir() {
        let package = ResolvedPackage::read(path, &label)?;
        return Ok(PackageReport::from(&package));
    }

    let scratch = tempfile::tempdir().context("failed to create a scratch directory")?;
    extract_zip(path, scratch.path()).map_err(|e| DescriptorError::InvalidArchive {
        package: label.clone(),
        message: format!("{:#}", e),
    })?;
    let package = ResolvedPackage::read(scratch.path(), &label)?;
    Ok(PackageReport::from(&package))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_prefab_aar, write_prefab_package};
    use tempfile::TempDir;

    #[test]
    fn test_inspect_archive() {
        let tmp = TempDir::new().unwrap();
        let aar = write_prefab_aar(tmp.path(), "zlib", "z", &[(Abi::Arm64, 21), (Abi::X86, 19)]);

        let report = inspect(&aar).unwrap();
        assert_eq!(report.name, "zlib");
        assert_eq!(report.modules.len(), 1);
        let module = &report.modules[0];
        assert_eq!(module.name, "z");
        assert_eq!(module.min_sdk_version, Some(19));
        let abis: Vec<Abi> = module.abis.iter().map(|a| a.abi).collect();
        assert_eq!(abis, vec![Abi::Arm64, Abi::X86]);
    }

    #[test]
    fn test_inspect_unpacked_tree() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("curl");
        write_prefab_package(&dir, "curl", "curl", &[(Abi::X86_64, 21)]);

        let report = inspect(&dir).unwrap();
        assert!(report.to_string().starts_with("curl"));
        assert!(report.to_string().contains("module curl (shared)"));
    }

    #[test]
    fn test_inspect_not_an_archive() {
        let tmp = TempDir::new().unwrap();
        let bogus = tmp.path().join("bogus.aar");
        std::fs::write(&bogus, "not a zip").unwrap();

        let err = inspect(&bogus).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DescriptorError>(),
            Some(DescriptorError::InvalidArchive { package, .. }) if package == "bogus.aar"
        ));
    }
}
