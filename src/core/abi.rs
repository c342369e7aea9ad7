//! Android ABI definitions.
//!
//! Every port is built once per ABI. The ABI decides the binutils triple,
//! the directory names used in install trees and prefab packages, and the
//! lowest API level the NDK supports for it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An Android ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Abi {
    Arm,
    Arm64,
    X86,
    X86_64,
}

impl Abi {
    /// All ABIs, in the order ports are built.
    pub const ALL: [Abi; 4] = [Abi::Arm, Abi::Arm64, Abi::X86, Abi::X86_64];

    /// Architecture name (`arm`, `arm64`, ...).
    pub fn arch_name(&self) -> &'static str {
        match self {
            Abi::Arm => "arm",
            Abi::Arm64 => "arm64",
            Abi::X86 => "x86",
            Abi::X86_64 => "x86_64",
        }
    }

    /// ABI name as used by the NDK and prefab (`armeabi-v7a`, ...).
    pub fn abi_name(&self) -> &'static str {
        match self {
            Abi::Arm => "armeabi-v7a",
            Abi::Arm64 => "arm64-v8a",
            Abi::X86 => "x86",
            Abi::X86_64 => "x86_64",
        }
    }

    /// Binutils triple, also used for sysroot library directories.
    pub fn triple(&self) -> &'static str {
        match self {
            Abi::Arm => "arm-linux-androideabi",
            Abi::Arm64 => "aarch64-linux-android",
            Abi::X86 => "i686-linux-android",
            Abi::X86_64 => "x86_64-linux-android",
        }
    }

    /// Lowest API level supported by the NDK for this ABI.
    pub fn min_supported_version(&self) -> u32 {
        21
    }

    /// Raise `min_sdk_version` to the lowest level this ABI supports.
    pub fn adjust_min_sdk_version(&self, min_sdk_version: u32) -> u32 {
        min_sdk_version.max(self.min_supported_version())
    }

    /// Look up an ABI by its NDK name.
    pub fn from_abi_name(name: &str) -> Option<Abi> {
        Abi::ALL.into_iter().find(|abi| abi.abi_name() == name)
    }
}

impl fmt::Display for Abi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.abi_name())
    }
}

impl FromStr for Abi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Abi::from_abi_name(s).ok_or_else(|| {
            format!(
                "unknown ABI `{}` (expected one of: {})",
                s,
                Abi::ALL
                    .iter()
                    .map(|a| a.abi_name())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
    }
}

impl Serialize for Abi {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.abi_name())
    }
}

impl<'de> Deserialize<'de> for Abi {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
