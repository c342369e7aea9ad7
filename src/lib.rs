//! ndkports - builds third-party C/C++ libraries into prefab packages for
//! the Android NDK.
//!
//! A port is described by a `Port.toml`. Its sources are acquired, its
//! dependency packages resolved into a sysroot, and a build backend run once
//! per ABI; the install trees are then reshaped into a prefab package and
//! archived as an `.aar` that other ports can depend on.

pub mod builder;
pub mod core;
pub mod ops;
pub mod package;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test utilities and fakes for ndkports unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides a fake process runner, a fake git cloner and fixture builders.
#[cfg(test)]
pub mod test_support;

pub use core::{Abi, Manifest, Ndk, PortLayout};
pub use ops::{PortSession, TaskKind};
pub use util::context::GlobalContext;
