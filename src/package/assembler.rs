//! Build the intermediate package tree (`build/port/aar`) from install trees.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::abi::Abi;
use crate::core::descriptor::{
    abi_dir_name, AbiMetadata, ModuleMetadata, PackageMetadata, ABI_METADATA_FILE, MODULES_DIR,
    MODULE_METADATA_FILE, PACKAGE_METADATA_FILE, PREFAB_DIR, SCHEMA_VERSION, STL,
};
use crate::core::layout::PortLayout;
use crate::core::manifest::{Manifest, ModuleDescription};
use crate::core::ndk::Ndk;
use crate::package::PackagingError;
use crate::util::fs::{copy_dir_all, copy_file, ensure_dir, list_files_sorted, recreate_dir, write_string};
use crate::util::hash::same_contents;

/// Android target SDK recorded in `AndroidManifest.xml`.
const TARGET_SDK_VERSION: u32 = 29;

/// Regenerate `build/port/aar` for `manifest` and return its path.
pub fn assemble(manifest: &Manifest, layout: &PortLayout, ndk: &Ndk) -> Result<PathBuf> {
    let package_dir = layout.package_dir();
    recreate_dir(&package_dir)?;
    let prefab = package_dir.join(PREFAB_DIR);
    ensure_dir(&prefab.join(MODULES_DIR))?;

    let metadata = PackageMetadata {
        schema_version: SCHEMA_VERSION,
        name: manifest.name().to_string(),
        dependencies: manifest.dependencies.iter().map(|d| d.name.clone()).collect(),
        version: Some(manifest.cmake_version()?.to_string()),
    };
    write_json(&prefab.join(PACKAGE_METADATA_FILE), &metadata)?;

    for module in &manifest.modules {
        install_module(manifest, layout, ndk, module, &prefab.join(MODULES_DIR))
            .with_context(|| format!("failed to package module `{}`", module.name))?;
    }

    install_license(manifest, layout, &package_dir)?;
    write_string(
        &package_dir.join("AndroidManifest.xml"),
        &android_manifest(&manifest.package_id(), manifest.min_sdk_version()),
    )?;

    tracing::info!("Assembled package tree in {}", package_dir.display());
    Ok(package_dir)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string(value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    write_string(path, &text)
}

fn install_module(
    manifest: &Manifest,
    layout: &PortLayout,
    ndk: &Ndk,
    module: &ModuleDescription,
    modules_dir: &Path,
) -> Result<()> {
    if module.includes_per_abi {
        return Err(PackagingError::IncludesPerAbi(module.name.clone()).into());
    }

    let module_dir = modules_dir.join(&module.name);
    ensure_dir(&module_dir)?;
    let metadata = ModuleMetadata {
        export_libraries: module.dependencies.clone(),
        include_dirs: vec!["include".to_string()],
        static_: module.static_,
        header_only: module.header_only,
        ..ModuleMetadata::default()
    };
    write_json(&module_dir.join(MODULE_METADATA_FILE), &metadata)?;

    let abis = manifest.abis();
    let Some(&first) = abis.first() else {
        return Ok(());
    };
    let headers = install_dir_for(layout, module, first)?.join("include");
    if !headers.is_dir() {
        return Err(PackagingError::MissingHeaders {
            module: module.name.clone(),
            path: headers,
        }
        .into());
    }
    for &abi in &abis[1..] {
        let other = layout.install_dir(abi).join("include");
        if other.is_dir() && !same_tree(&headers, &other)? {
            tracing::warn!(
                "Headers for {} differ from {}; packaging the {} headers",
                abi,
                first,
                first
            );
        }
    }
    copy_dir_all(&headers, &module_dir.join("include"))?;

    if module.header_only {
        return Ok(());
    }

    let api_floor = manifest.min_sdk_version();
    for &abi in abis {
        let install = install_dir_for(layout, module, abi)?;
        let library_name = module.library_file_name();
        let library = install.join("lib").join(&library_name);
        if !library.is_file() {
            return Err(PackagingError::MissingLibrary {
                module: module.name.clone(),
                abi,
                path: library,
            }
            .into());
        }

        let libs = module_dir.join("libs").join(abi_dir_name(abi));
        copy_file(&library, &libs.join(&library_name))?;
        write_json(
            &libs.join(ABI_METADATA_FILE),
            &AbiMetadata {
                abi,
                api: abi.adjust_min_sdk_version(api_floor),
                ndk: ndk.version().major,
                stl: STL.to_string(),
                static_: module.static_,
            },
        )?;
    }
    Ok(())
}

fn install_dir_for(layout: &PortLayout, module: &ModuleDescription, abi: Abi) -> Result<PathBuf> {
    let dir = layout.install_dir(abi);
    if !dir.is_dir() {
        return Err(PackagingError::MissingAbiOutput {
            module: module.name.clone(),
            abi,
            path: dir,
        }
        .into());
    }
    Ok(dir)
}

/// Whether two directories hold the same files with the same contents.
fn same_tree(a: &Path, b: &Path) -> Result<bool> {
    let files = list_files_sorted(a)?;
    if files != list_files_sorted(b)? {
        return Ok(false);
    }
    for file in files {
        if !same_contents(&a.join(&file), &b.join(&file))? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn install_license(manifest: &Manifest, layout: &PortLayout, package_dir: &Path) -> Result<()> {
    let license = layout.source_dir().join(&manifest.package.license);
    if !license.is_file() {
        return Err(PackagingError::MissingLicense(license).into());
    }
    let file_name = license
        .file_name()
        .with_context(|| format!("license path has no file name: {}", license.display()))?;
    copy_file(&license, &package_dir.join("META-INF").join(file_name))
}

pub fn android_manifest(package_id: &str, min_sdk_version: u32) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    package="{}"
    android:versionCode="1"
    android:versionName="1.0">
    <uses-sdk
        android:minSdkVersion="{}"
        android:targetSdkVersion="{}" />
</manifest>
"#,
        package_id, min_sdk_version, TARGET_SDK_VERSION
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ResolvedPackage;
    use crate::test_support::{fake_ndk, write_install_tree, PortFixture};
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    struct Setup {
        _tmp: TempDir,
        manifest: Manifest,
        layout: PortLayout,
        ndk: Ndk,
    }

    fn setup(fixture: PortFixture) -> Setup {
        let tmp = TempDir::new().unwrap();
        let dir = fixture.write_to(tmp.path());
        let manifest = Manifest::load(&dir.join("Port.toml")).unwrap();
        let layout = PortLayout::for_project(&dir);
        copy_dir_all(&dir.join("upstream"), &layout.source_dir()).unwrap();
        let ndk = Ndk::open(&fake_ndk(tmp.path(), "25.2.9519653")).unwrap();
        Setup {
            _tmp: tmp,
            manifest,
            layout,
            ndk,
        }
    }

    #[test]
    fn test_assemble_package_tree() {
        let s = setup(
            PortFixture::new("zlib", "1.2.13")
                .with_package("abis = [\"arm64-v8a\", \"x86_64\"]\nmin-sdk-version = 16")
                .with_section("[[module]]\nname = \"z\""),
        );
        write_install_tree(&s.layout, &[Abi::Arm64, Abi::X86_64], &[("z", false)]);

        let dir = assemble(&s.manifest, &s.layout, &s.ndk).unwrap();

        let package = ResolvedPackage::read(&dir, "zlib").unwrap();
        assert_eq!(package.metadata.version.as_deref(), Some("1.2.13"));
        let module = package.module("z").unwrap();
        assert_eq!(module.abi_set(), BTreeSet::from([Abi::Arm64, Abi::X86_64]));
        assert_eq!(module.min_sdk_version(), Some(21));
        assert_eq!(module.abis[&Abi::Arm64].ndk, 25);
        assert_eq!(module.abis[&Abi::Arm64].stl, "c++_shared");
        assert!(dir.join("prefab/modules/z/include/z.h").is_file());
        assert!(dir.join("META-INF/LICENSE").is_file());

        let xml = fs::read_to_string(dir.join("AndroidManifest.xml")).unwrap();
        assert!(xml.contains("package=\"com.android.ndk.thirdparty.zlib\""));
        assert!(xml.contains("android:minSdkVersion=\"16\""));
        assert!(xml.contains("android:targetSdkVersion=\"29\""));
    }

    #[test]
    fn test_assemble_regenerates_tree() {
        let s = setup(PortFixture::new("zlib", "1.2.13").with_package("abis = [\"x86\"]"));
        write_install_tree(&s.layout, &[Abi::X86], &[("zlib", false)]);

        let dir = assemble(&s.manifest, &s.layout, &s.ndk).unwrap();
        fs::write(dir.join("stale.txt"), "").unwrap();
        assemble(&s.manifest, &s.layout, &s.ndk).unwrap();
        assert!(!dir.join("stale.txt").exists());
    }

    #[test]
    fn test_missing_abi_names_module_and_abi() {
        let s = setup(
            PortFixture::new("zlib", "1.2.13").with_package("abis = [\"arm64-v8a\", \"x86\"]"),
        );
        write_install_tree(&s.layout, &[Abi::Arm64], &[("zlib", false)]);

        let err = assemble(&s.manifest, &s.layout, &s.ndk).unwrap_err();
        match err.downcast_ref::<PackagingError>() {
            Some(PackagingError::MissingAbiOutput { module, abi, .. }) => {
                assert_eq!(module, "zlib");
                assert_eq!(*abi, Abi::X86);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.root_cause().to_string().contains("x86"));
    }

    #[test]
    fn test_missing_library() {
        let s = setup(
            PortFixture::new("ssl", "1.1.1")
                .with_package("abis = [\"arm64-v8a\"]")
                .with_section("[[module]]\nname = \"ssl\"\nstatic = true"),
        );
        // shared library installed where a static one is expected
        write_install_tree(&s.layout, &[Abi::Arm64], &[("ssl", false)]);

        let err = assemble(&s.manifest, &s.layout, &s.ndk).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PackagingError>(),
            Some(PackagingError::MissingLibrary { path, .. }) if path.ends_with("libssl.a")
        ));
    }

    #[test]
    fn test_header_only_module() {
        let s = setup(
            PortFixture::new("glm", "0.9.9")
                .with_package("abis = [\"arm64-v8a\"]")
                .with_section("[[module]]\nname = \"glm\"\nheader-only = true"),
        );
        let include = s.layout.install_dir(Abi::Arm64).join("include");
        fs::create_dir_all(&include).unwrap();
        fs::write(include.join("glm.hpp"), "").unwrap();

        let dir = assemble(&s.manifest, &s.layout, &s.ndk).unwrap();
        assert!(dir.join("prefab/modules/glm/include/glm.hpp").is_file());
        assert!(!dir.join("prefab/modules/glm/libs").exists());
        let package = ResolvedPackage::read(&dir, "glm").unwrap();
        assert!(package.module("glm").unwrap().is_header_only());
    }

    #[test]
    fn test_includes_per_abi_rejected() {
        let s = setup(
            PortFixture::new("x", "1")
                .with_package("abis = [\"x86\"]")
                .with_section("[[module]]\nname = \"x\"\nincludes-per-abi = true"),
        );
        write_install_tree(&s.layout, &[Abi::X86], &[("x", false)]);

        let err = assemble(&s.manifest, &s.layout, &s.ndk).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PackagingError>(),
            Some(PackagingError::IncludesPerAbi(name)) if name == "x"
        ));
    }

    #[test]
    fn test_missing_license() {
        let s = setup(
            PortFixture::new("x", "1")
                .with_package("abis = [\"x86\"]\nlicense = \"COPYING\""),
        );
        write_install_tree(&s.layout, &[Abi::X86], &[("x", false)]);

        let err = assemble(&s.manifest, &s.layout, &s.ndk).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PackagingError>(),
            Some(PackagingError::MissingLicense(path)) if path.ends_with("COPYING")
        ));
    }

    #[test]
    fn test_export_libraries_and_dependencies() {
        let s = setup(
            PortFixture::new("curl", "7.79.1")
                .with_package("abis = [\"arm64-v8a\"]")
                .with_section(
                    "[[module]]\nname = \"curl\"\ndependencies = [\"//openssl:ssl\"]\n\n\
                     [dependencies]\nopenssl = { archive = \"openssl.aar\" }",
                ),
        );
        write_install_tree(&s.layout, &[Abi::Arm64], &[("curl", false)]);

        let dir = assemble(&s.manifest, &s.layout, &s.ndk).unwrap();
        let package = ResolvedPackage::read(&dir, "curl").unwrap();
        assert_eq!(package.metadata.dependencies, vec!["openssl".to_string()]);
        assert_eq!(
            package.module("curl").unwrap().metadata.export_libraries,
            vec!["//openssl:ssl".to_string()]
        );
    }
}
