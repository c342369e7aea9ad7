//! On-disk fixtures: fake NDKs, prefab packages, source tarballs and port
//! projects.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::abi::Abi;
use crate::core::descriptor::{abi_dir_name, AbiMetadata, ModuleMetadata, PackageMetadata, STL};
use crate::core::layout::PortLayout;
use crate::util::archive::write_zip_deterministic;

fn write(path: &Path, contents: impl AsRef<[u8]>) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) {
    write(path, serde_json::to_string_pretty(value).unwrap());
}

/// A directory that looks enough like an NDK for [`crate::core::Ndk::open`].
pub fn fake_ndk(dir: &Path, version: &str) -> PathBuf {
    let ndk = dir.join("ndk").join(version);
    write(
        &ndk.join("source.properties"),
        format!("Pkg.Desc = Android NDK\nPkg.Revision = {}\n", version),
    );
    fs::create_dir_all(ndk.join("toolchains/llvm/prebuilt/linux-x86_64/bin")).unwrap();
    fs::create_dir_all(ndk.join("toolchains/llvm/prebuilt/linux-x86_64/sysroot")).unwrap();
    write(&ndk.join("build/cmake/android.toolchain.cmake"), "# toolchain\n");
    ndk
}

/// Write an unpacked prefab package with one shared-library module.
///
/// The module ships `include/<module>.h` and, per ABI, `lib<module>.so`
/// with an `abi.json` declaring the given API level.
pub fn write_prefab_package(dir: &Path, package: &str, module: &str, abis: &[(Abi, u32)]) {
    let prefab = dir.join("prefab");
    write_json(
        &prefab.join("prefab.json"),
        &PackageMetadata {
            schema_version: 1,
            name: package.to_string(),
            dependencies: Vec::new(),
            version: Some("1".to_string()),
        },
    );

    let module_dir = prefab.join("modules").join(module);
    write_json(
        &module_dir.join("module.json"),
        &ModuleMetadata {
            include_dirs: vec!["include".to_string()],
            ..ModuleMetadata::default()
        },
    );
    write(
        &module_dir.join("include").join(format!("{}.h", module)),
        format!("int {}_init(void);\n", module),
    );

    for &(abi, api) in abis {
        let libs = module_dir.join("libs").join(abi_dir_name(abi));
        write_json(
            &libs.join("abi.json"),
            &AbiMetadata {
                abi,
                api,
                ndk: 25,
                stl: STL.to_string(),
                static_: false,
            },
        );
        write(&libs.join(format!("lib{}.so", module)), "\x7fELF");
    }
}

/// Write a prefab package and zip it to `<dir>/<package>.aar`.
pub fn write_prefab_aar(dir: &Path, package: &str, module: &str, abis: &[(Abi, u32)]) -> PathBuf {
    let tree = dir.join(format!("{}-tree", package));
    write_prefab_package(&tree, package, module, abis);
    let aar = dir.join(format!("{}.aar", package));
    write_zip_deterministic(&tree, &aar).unwrap();
    aar
}

/// Write a gzipped tarball whose entries all sit under `top_dir/`.
pub fn write_source_tarball(path: &Path, top_dir: &str, files: &[(&str, &str)]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let file = fs::File::create(path).unwrap();
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{}/{}", top_dir, name), contents.as_bytes())
            .unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap();
}

/// Populate `install/<abi>` the way a successful build of `libs` would.
pub fn write_install_tree(layout: &PortLayout, abis: &[Abi], libs: &[(&str, bool)]) {
    for &abi in abis {
        let install = layout.install_dir(abi);
        for &(name, is_static) in libs {
            write(
                &install.join("include").join(format!("{}.h", name)),
                format!("int {}_init(void);\n", name),
            );
            let ext = if is_static { "a" } else { "so" };
            write(
                &install.join("lib").join(format!("lib{}.{}", name, ext)),
                format!("{} {}", name, abi),
            );
        }
    }
}

/// A port project: `Port.toml` plus a directory source under `upstream/`.
#[derive(Debug, Clone)]
pub struct PortFixture {
    pub name: String,
    pub version: String,
    /// Extra keys appended to `[package]`.
    pub package_extra: String,
    /// Tables written after `[source]`.
    pub sections: String,
    /// Files under the project directory.
    pub files: Vec<(PathBuf, String)>,
}

impl PortFixture {
    /// A port of `name` built with CMake from `upstream/`, with a license.
    pub fn new(name: &str, version: &str) -> Self {
        PortFixture {
            name: name.to_string(),
            version: version.to_string(),
            package_extra: String::new(),
            sections: String::new(),
            files: vec![
                (PathBuf::from("upstream/LICENSE"), "Permission granted.\n".to_string()),
                (
                    PathBuf::from(format!("upstream/{}.c", name)),
                    format!("int {}_init(void) {{ return 0; }}\n", name),
                ),
            ],
        }
    }

    /// Extra keys for `[package]`, e.g. `abis = ["arm64-v8a"]`.
    pub fn with_package(mut self, keys: &str) -> Self {
        self.package_extra.push_str(keys);
        self.package_extra.push('\n');
        self
    }

    /// Extra tables, e.g. `[build]` or `[[module]]`.
    pub fn with_section(mut self, toml: &str) -> Self {
        self.sections.push_str(toml);
        self.sections.push('\n');
        self
    }

    pub fn manifest(&self) -> String {
        format!(
            "[package]\nname = \"{}\"\nversion = \"{}\"\n{}\n[source]\npath = \"upstream\"\n\n{}",
            self.name, self.version, self.package_extra, self.sections
        )
    }

    /// Write the project to `<base>/<name>` and return that directory.
    pub fn write_to(&self, base: &Path) -> PathBuf {
        let dir = base.join(&self.name);
        write(&dir.join("Port.toml"), self.manifest());
        for (path, contents) in &self.files {
            write(&dir.join(path), contents);
        }
        dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::manifest::Manifest;

    #[test]
    fn test_port_fixture_parses() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = PortFixture::new("zlib", "1.2.13")
            .with_package("abis = [\"arm64-v8a\"]")
            .write_to(tmp.path());

        let manifest = Manifest::load(&dir.join("Port.toml")).unwrap();
        assert_eq!(manifest.name(), "zlib");
        assert_eq!(manifest.abis(), &[Abi::Arm64]);
        assert!(dir.join("upstream/LICENSE").is_file());
    }
}
