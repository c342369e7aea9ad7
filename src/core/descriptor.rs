//! Prefab descriptor files.
//!
//! A packaged port carries three kinds of JSON descriptors:
//!
//! ```text
//! prefab/prefab.json
//! prefab/modules/<module>/module.json
//! prefab/modules/<module>/libs/android.<abi>/abi.json
//! ```
//!
//! The same format is written by the package assembler and read back by the
//! dependency resolver, so a package built here can be consumed by another
//! port.

use serde::{Deserialize, Serialize};

use crate::core::abi::Abi;

/// Directory holding the prefab tree inside a package.
pub const PREFAB_DIR: &str = "prefab";
/// Package descriptor file name.
pub const PACKAGE_METADATA_FILE: &str = "prefab.json";
/// Module directory inside [`PREFAB_DIR`].
pub const MODULES_DIR: &str = "modules";
/// Module descriptor file name.
pub const MODULE_METADATA_FILE: &str = "module.json";
/// Per-ABI descriptor file name.
pub const ABI_METADATA_FILE: &str = "abi.json";
/// The only prefab schema version produced and accepted.
pub const SCHEMA_VERSION: u32 = 1;
/// STL every port is linked against.
pub const STL: &str = "c++_shared";

/// Directory name of an ABI inside a module's `libs` directory.
pub fn abi_dir_name(abi: Abi) -> String {
    format!("android.{}", abi.abi_name())
}

/// Parse an ABI back out of an `android.<abi>` directory name.
pub fn abi_from_dir_name(name: &str) -> Option<Abi> {
    name.strip_prefix("android.").and_then(Abi::from_abi_name)
}

/// `prefab.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub schema_version: u32,
    pub name: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// `module.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMetadata {
    /// Libraries this module exports to its users, in prefab's
    /// `//package:module` or `:module` notation.
    #[serde(default)]
    pub export_libraries: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_name: Option<String>,

    /// Include directories relative to the module directory.
    #[serde(default = "default_include_dirs")]
    pub include_dirs: Vec<String>,

    #[serde(default, rename = "static")]
    pub static_: bool,

    #[serde(default)]
    pub header_only: bool,
}

fn default_include_dirs() -> Vec<String> {
    vec!["include".to_string()]
}

/// `abi.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiMetadata {
    pub abi: Abi,
    pub api: u32,
    pub ndk: u32,
    pub stl: String,
    #[serde(default, rename = "static")]
    pub static_: bool,
}
