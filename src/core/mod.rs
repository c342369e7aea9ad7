//! Core data structures for ndkports.
//!
//! This module contains the foundational types used throughout ndkports:
//! - ABIs, NDK installations and toolchain paths
//! - Versions (CMake-compatible package versions, NDK revisions)
//! - The Port.toml manifest and the build tree layout
//! - Prefab descriptors and attribute-scoped dependency configurations

pub mod abi;
pub mod configuration;
pub mod descriptor;
pub mod layout;
pub mod manifest;
pub mod ndk;
pub mod version;

pub use abi::Abi;
pub use configuration::{DependencyConfigurations, Publication};
pub use layout::PortLayout;
pub use manifest::Manifest;
pub use ndk::{Ndk, Toolchain};
pub use version::{CMakeCompatibleVersion, NdkVersion};
