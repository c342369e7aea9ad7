//! Merge resolved packages into per-triple sysroots.
//!
//! Port backends see dependencies as a plain sysroot:
//!
//! ```text
//! generated/<triple>/include/...
//! generated/<triple>/lib/lib<module>.{so,a}
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::core::abi::Abi;
use crate::resolver::layout::{ResolvedLayout, ResolvedModule};
use crate::resolver::DescriptorError;
use crate::util::fs::{copy_file, ensure_dir};
use crate::util::hash::same_contents;

/// Populate `generated/` for `abis` at `min_sdk_version`.
///
/// The `generated` directory is created even when there is nothing to install.
pub fn generate(layout: &ResolvedLayout, abis: &[Abi], min_sdk_version: u32) -> Result<()> {
    ensure_dir(&layout.generated_dir())?;

    for package in &layout.packages {
        for module in &package.modules {
            for &abi in abis {
                install_module(layout, package.name(), module, abi, min_sdk_version)?;
            }
        }
    }
    Ok(())
}

fn install_module(
    layout: &ResolvedLayout,
    package: &str,
    module: &ResolvedModule,
    abi: Abi,
    min_sdk_version: u32,
) -> Result<()> {
    let sysroot = layout.sysroot(abi);
    let include = sysroot.join("include");

    for dir in module.include_dirs() {
        if dir.is_dir() {
            install_headers(&dir, &include)?;
        }
    }

    if module.is_header_only() {
        return Ok(());
    }

    let Some(meta) = module.abis.get(&abi) else {
        tracing::debug!("{}:{} has no library for {}", package, module.name, abi);
        return Ok(());
    };
    let api = abi.adjust_min_sdk_version(min_sdk_version);
    if meta.api > api {
        return Err(DescriptorError::IncompatibleApi {
            package: package.to_string(),
            module: module.name.clone(),
            abi,
            required: meta.api,
            requested: api,
        }
        .into());
    }

    let library = module.library_for(abi).ok_or_else(|| DescriptorError::Malformed {
        package: package.to_string(),
        path: module.libs_dir(abi),
        message: format!("no library for module `{}`", module.name),
    })?;
    let file_name = library
        .file_name()
        .with_context(|| format!("library path has no file name: {}", library.display()))?;
    copy_file(&library, &sysroot.join("lib").join(file_name))
}

/// Copy headers, skipping identical duplicates and rejecting differing ones.
fn install_headers(src: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", src.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("{} escaped {}", entry.path().display(), src.display()))?;
        let target = dest.join(relative);

        if target.exists() {
            if !same_contents(&target, entry.path())? {
                return Err(DescriptorError::ConflictingHeader(relative.to_path_buf()).into());
            }
            continue;
        }

        copy_file(entry.path(), &target)?;
    }
    Ok(())
}
