//! Dependency resolution.
//!
//! Declared dependencies are selected through the `consumedAars`
//! configuration, then each selected archive is unpacked into a layout
//! namespaced by NDK and API level, and finally merged into per-triple
//! sysroots the port backends build against.

pub mod layout;
pub mod sysroot;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use thiserror::Error;

use crate::core::abi::Abi;
use crate::core::configuration::{
    Attributes, DependencyConfigurations, DependencyOrigin, Publication, Variant,
};
use crate::core::layout::PortLayout;
use crate::util::archive::extract_zip;
use crate::util::fs::recreate_dir;

pub use layout::{ResolvedLayout, ResolvedModule, ResolvedPackage};

/// Errors reading or selecting dependency packages.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum DescriptorError {
    #[error("package `{package}` is missing {}", .path.display())]
    #[diagnostic(code(ndkports::descriptor::missing_manifest))]
    MissingManifest { package: String, path: PathBuf },

    #[error("package `{package}` has a malformed {}: {message}", .path.display())]
    #[diagnostic(code(ndkports::descriptor::malformed))]
    Malformed {
        package: String,
        path: PathBuf,
        message: String,
    },

    #[error("package `{package}` uses prefab schema version {found}, only 1 is supported")]
    #[diagnostic(code(ndkports::descriptor::unsupported_schema))]
    UnsupportedSchema { package: String, found: u32 },

    #[error("package `{package}` could not be unpacked: {message}")]
    #[diagnostic(code(ndkports::descriptor::invalid_archive))]
    InvalidArchive { package: String, message: String },

    #[error("two dependency archives unpack to `{0}`")]
    #[diagnostic(
        code(ndkports::descriptor::duplicate_package),
        help("Rename one of the archives so their file names differ")
    )]
    DuplicatePackage(String),

    #[error("found duplicate headers with non-equal contents: {}", .0.display())]
    #[diagnostic(code(ndkports::descriptor::conflicting_header))]
    ConflictingHeader(PathBuf),

    #[error("{package}:{module} for {abi} requires API {required}, but the port targets API {requested}")]
    #[diagnostic(
        code(ndkports::descriptor::incompatible_api),
        help("Raise `min-sdk-version` in [package]")
    )]
    IncompatibleApi {
        package: String,
        module: String,
        abi: Abi,
        required: u32,
        requested: u32,
    },

    #[error("dependency `{dependency}` has not been exported: {} does not exist", .path.display())]
    #[diagnostic(
        code(ndkports::descriptor::not_exported),
        help("Build the dependency port first with `ndkports build`")
    )]
    NotExported { dependency: String, path: PathBuf },

    #[error("dependency `{dependency}` publishes no variant with artifactType=aar")]
    #[diagnostic(code(ndkports::descriptor::no_matching_variant))]
    NoMatchingVariant { dependency: String },

    #[error("dependency archive for `{dependency}` does not exist: {}", .path.display())]
    #[diagnostic(code(ndkports::descriptor::missing_archive))]
    MissingArchive { dependency: String, path: PathBuf },
}

/// The archives to resolve for a port, in declaration order.
pub fn select_artifacts(configs: &DependencyConfigurations) -> Result<Vec<PathBuf>> {
    let consumer = &configs.consumed_aars;
    let mut selected = Vec::new();

    for dependency in consumer.dependencies() {
        let publication = match &dependency.origin {
            DependencyOrigin::Project(project) => {
                let path = PortLayout::for_project(project).publication_path();
                if !path.is_file() {
                    return Err(DescriptorError::NotExported {
                        dependency: dependency.name.clone(),
                        path,
                    }
                    .into());
                }
                Publication::load(&path)?
            }
            DependencyOrigin::Archive(archive) => Publication {
                module: dependency.name.clone(),
                version: String::new(),
                variants: vec![Variant {
                    attributes: Attributes::aar(),
                    file: archive.clone(),
                }],
            },
        };

        let variants = consumer.select(&publication)?;
        if variants.is_empty() {
            return Err(DescriptorError::NoMatchingVariant {
                dependency: dependency.name.clone(),
            }
            .into());
        }
        for variant in variants {
            if !variant.file.is_file() {
                return Err(DescriptorError::MissingArchive {
                    dependency: dependency.name.clone(),
                    path: variant.file.clone(),
                }
                .into());
            }
            tracing::debug!("Selected {} for {}", variant.file.display(), dependency.name);
            selected.push(variant.file.clone());
        }
    }

    Ok(selected)
}

fn archive_stem(archive: &Path) -> String {
    archive
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| archive.display().to_string())
}

fn archive_label(archive: &Path) -> String {
    archive
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| archive.display().to_string())
}

/// Unpack `archives` into a fresh layout at `root` and generate sysroots.
///
/// `root` is wiped first, so resolving twice never duplicates entries.
pub fn resolve_dependencies(
    archives: &[PathBuf],
    root: &Path,
    abis: &[Abi],
    min_sdk_version: u32,
) -> Result<ResolvedLayout> {
    recreate_dir(root)?;

    let mut archives = archives.to_vec();
    archives.sort_by_key(|a| archive_label(a));
    let mut stems = BTreeSet::new();
    for archive in &archives {
        let stem = archive_stem(archive);
        if !stems.insert(stem.clone()) {
            return Err(DescriptorError::DuplicatePackage(stem).into());
        }
    }

    let packages_dir = ResolvedLayout::packages_dir(root);
    let packages = archives
        .par_iter()
        .map(|archive| -> Result<ResolvedPackage> {
            let label = archive_label(archive);
            let dest = packages_dir.join(archive_stem(archive));
            tracing::debug!("Unpacking {} into {}", archive.display(), dest.display());

            extract_zip(archive, &dest).map_err(|e| DescriptorError::InvalidArchive {
                package: label.clone(),
                message: format!("{:#}", e),
            })?;
            Ok(ResolvedPackage::read(&dest, &label)?)
        })
        .collect::<Result<Vec<_>>>()?;

    let layout = ResolvedLayout {
        root: root.to_path_buf(),
        packages,
    };
    sysroot::generate(&layout, abis, min_sdk_version)
        .with_context(|| format!("failed to generate sysroot in {}", root.display()))?;

    tracing::info!(
        "Resolved {} dependency package(s) into {}",
        layout.packages.len(),
        root.display()
    );
    Ok(layout)
}
