//! Archive the package tree and publish it as an `aar` variant.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::configuration::{DependencyConfigurations, Publication};
use crate::core::layout::PortLayout;
use crate::core::manifest::Manifest;
use crate::util::archive::write_zip_deterministic;

/// The result of exporting a port.
#[derive(Debug, Clone)]
pub struct Exported {
    pub archive: PathBuf,
    pub publication: Publication,
}

/// Zip `build/port/aar` into `outputs/<name>-<version>.aar` and record it in
/// `publication.json` under the exported configuration.
pub fn export(
    manifest: &Manifest,
    layout: &PortLayout,
    configs: &DependencyConfigurations,
) -> Result<Exported> {
    let archive = layout.archive_path(manifest.name(), manifest.version());
    write_zip_deterministic(&layout.package_dir(), &archive)
        .with_context(|| format!("failed to archive {}", layout.package_dir().display()))?;

    let publication =
        configs
            .exported_aars
            .publish(manifest.name(), manifest.version(), archive.clone())?;
    publication.save(&layout.publication_path())?;

    tracing::info!("Exported {}", archive.display());
    Ok(Exported {
        archive,
        publication,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::abi::Abi;
    use crate::core::configuration::{Attributes, Configuration, Variant, AAR_ARTIFACT_TYPE, ARTIFACT_TYPE};
    use crate::core::ndk::Ndk;
    use crate::package::assemble;
    use crate::resolver::resolve_dependencies;
    use crate::test_support::{fake_ndk, write_install_tree, PortFixture};
    use crate::util::fs::copy_dir_all;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn exported_port(tmp: &std::path::Path) -> (Manifest, PortLayout, Exported) {
        let dir = PortFixture::new("zlib", "1.2.13")
            .with_package("abis = [\"armeabi-v7a\", \"x86\"]\nmin-sdk-version = 23")
            .with_section("[[module]]\nname = \"z\"")
            .write_to(tmp);
        let manifest = Manifest::load(&dir.join("Port.toml")).unwrap();
        let layout = PortLayout::for_project(&dir);
        copy_dir_all(&dir.join("upstream"), &layout.source_dir()).unwrap();
        write_install_tree(&layout, &[Abi::Arm, Abi::X86], &[("z", false)]);
        let ndk = Ndk::open(&fake_ndk(tmp, "25.2.9519653")).unwrap();

        assemble(&manifest, &layout, &ndk).unwrap();
        let configs = DependencyConfigurations::new(manifest.dependencies.clone());
        let exported = export(&manifest, &layout, &configs).unwrap();
        (manifest, layout, exported)
    }

    #[test]
    fn test_export_round_trips_through_resolver() {
        let tmp = TempDir::new().unwrap();
        let (_, layout, exported) = exported_port(tmp.path());

        assert_eq!(exported.archive, layout.archive_path("zlib", "1.2.13"));
        let resolved = resolve_dependencies(
            &[exported.archive.clone()],
            &tmp.path().join("consumer/deps"),
            &[Abi::Arm, Abi::X86],
            23,
        )
        .unwrap();

        let module = resolved.module("zlib", "z").unwrap();
        assert_eq!(module.abi_set(), BTreeSet::from([Abi::Arm, Abi::X86]));
        assert_eq!(module.min_sdk_version(), Some(23));
    }

    #[test]
    fn test_export_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        let (manifest, layout, first) = exported_port(tmp.path());
        let before = std::fs::read(&first.archive).unwrap();

        let configs = DependencyConfigurations::new(manifest.dependencies.clone());
        let second = export(&manifest, &layout, &configs).unwrap();
        assert_eq!(std::fs::read(&second.archive).unwrap(), before);
    }

    #[test]
    fn test_publication_only_matches_aar_requests() {
        let tmp = TempDir::new().unwrap();
        let (_, layout, exported) = exported_port(tmp.path());

        let saved = Publication::load(&layout.publication_path()).unwrap();
        assert_eq!(saved, exported.publication);
        assert_eq!(saved.variants.len(), 1);
        assert_eq!(
            saved.variants[0].attributes.get(ARTIFACT_TYPE),
            Some(AAR_ARTIFACT_TYPE)
        );

        let unattributed = Configuration::resolvable("plain", Attributes::new());
        assert!(unattributed.select(&saved).unwrap().is_empty());
        let jars = Configuration::resolvable("jars", Attributes::new().with(ARTIFACT_TYPE, "jar"));
        assert!(jars.select(&saved).unwrap().is_empty());
        let aars = Configuration::resolvable("aars", Attributes::aar());
        let selected: Vec<&Variant> = aars.select(&saved).unwrap();
        assert_eq!(selected[0].file, exported.archive);
    }
}
