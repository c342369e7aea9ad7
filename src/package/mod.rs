//! Packaging: reshape install trees into a prefab package and export it.

pub mod assembler;
pub mod exporter;

use std::path::PathBuf;

use thiserror::Error;

use crate::core::abi::Abi;

pub use assembler::assemble;
pub use exporter::{export, Exported};

/// Errors building the intermediate package tree.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum PackagingError {
    #[error("module `{module}` has no install directory for {abi}: {} does not exist", .path.display())]
    #[diagnostic(
        code(ndkports::package::missing_abi),
        help("The port step must populate build/port/install/<abi> for every configured ABI")
    )]
    MissingAbiOutput {
        module: String,
        abi: Abi,
        path: PathBuf,
    },

    #[error("module `{module}` is missing its library for {abi}: {}", .path.display())]
    #[diagnostic(
        code(ndkports::package::missing_library),
        help("Check that the build installs lib<module>.so, or lib<module>.a for static modules")
    )]
    MissingLibrary {
        module: String,
        abi: Abi,
        path: PathBuf,
    },

    #[error("module `{0}` sets includes-per-abi, which is not supported")]
    #[diagnostic(code(ndkports::package::includes_per_abi))]
    IncludesPerAbi(String),

    #[error("module `{module}` has no headers: {} does not exist", .path.display())]
    #[diagnostic(code(ndkports::package::missing_headers))]
    MissingHeaders { module: String, path: PathBuf },

    #[error("license file does not exist: {}", .0.display())]
    #[diagnostic(
        code(ndkports::package::missing_license),
        help("Set `license` in [package] to a path relative to the source directory")
    )]
    MissingLicense(PathBuf),
}
