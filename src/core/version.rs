//! Version formats: CMake-compatible package versions and NDK revisions.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

static CMAKE_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)(?:\.(\d+)(?:\.(\d+)(?:\.(\d+))?)?)?$").expect("valid regex")
});

static PKG_REVISION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Pkg\.Revision\s*=\s*(\S+)$").expect("valid regex"));

static NDK_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(\d+)\.(\d+)(?:-(\S+))?$").expect("valid regex"));

/// Errors from parsing or constructing versions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("{0} is not in major[.minor[.patch[.tweak]]] format")]
    InvalidCMakeVersion(String),

    #[error("minor must be set if patch is specified")]
    PatchWithoutMinor,

    #[error("patch must be set if tweak is specified")]
    TweakWithoutPatch,

    #[error("invalid NDK version string: {0}")]
    InvalidNdkVersion(String),

    #[error("did not find Pkg.Revision in source.properties")]
    MissingPkgRevision,
}

/// A version number compatible with CMake's package version format.
///
/// CMake package versions must be numeric with at most four dot separated
/// components. This is the version recorded in `prefab.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CMakeCompatibleVersion {
    major: u32,
    minor: Option<u32>,
    patch: Option<u32>,
    tweak: Option<u32>,
}

impl CMakeCompatibleVersion {
    /// Create a version. Components may only be omitted from the right.
    pub fn new(
        major: u32,
        minor: Option<u32>,
        patch: Option<u32>,
        tweak: Option<u32>,
    ) -> Result<Self, VersionError> {
        if tweak.is_some() && patch.is_none() {
            return Err(VersionError::TweakWithoutPatch);
        }
        if patch.is_some() && minor.is_none() {
            return Err(VersionError::PatchWithoutMinor);
        }
        Ok(CMakeCompatibleVersion {
            major,
            minor,
            patch,
            tweak,
        })
    }

    /// Parse a `major[.minor[.patch[.tweak]]]` string.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let invalid = || VersionError::InvalidCMakeVersion(s.to_string());
        let caps = CMAKE_VERSION_RE.captures(s).ok_or_else(invalid)?;

        let component = |i: usize| -> Result<Option<u32>, VersionError> {
            caps.get(i)
                .map(|m| m.as_str().parse::<u32>().map_err(|_| invalid()))
                .transpose()
        };

        let major = component(1)?.ok_or_else(invalid)?;
        CMakeCompatibleVersion::new(major, component(2)?, component(3)?, component(4)?)
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> Option<u32> {
        self.minor
    }

    pub fn patch(&self) -> Option<u32> {
        self.patch
    }

    pub fn tweak(&self) -> Option<u32> {
        self.tweak
    }
}

impl fmt::Display for CMakeCompatibleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.major)?;
        for component in [self.minor, self.patch, self.tweak].into_iter().map_while(|c| c) {
            write!(f, ".{}", component)?;
        }
        Ok(())
    }
}

impl FromStr for CMakeCompatibleVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CMakeCompatibleVersion::parse(s)
    }
}

impl Serialize for CMakeCompatibleVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CMakeCompatibleVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CMakeCompatibleVersion::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// The version of an NDK installation, read from `source.properties`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdkVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub qualifier: Option<String>,
}

impl NdkVersion {
    /// Parse a revision string such as `21.0.6113669` or `20.0.5392854-beta3`.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let invalid = || VersionError::InvalidNdkVersion(s.to_string());
        let caps = NDK_VERSION_RE.captures(s).ok_or_else(invalid)?;
        let number = |i: usize| caps[i].parse::<u32>().map_err(|_| invalid());

        Ok(NdkVersion {
            major: number(1)?,
            minor: number(2)?,
            build: number(3)?,
            qualifier: caps.get(4).map(|m| m.as_str().to_string()),
        })
    }

    /// Extract the version from the contents of an NDK `source.properties`.
    pub fn from_source_properties(text: &str) -> Result<Self, VersionError> {
        text.lines()
            .map(str::trim)
            .find_map(|line| PKG_REVISION_RE.captures(line))
            .map(|caps| NdkVersion::parse(&caps[1]))
            .unwrap_or(Err(VersionError::MissingPkgRevision))
    }
}

impl fmt::Display for NdkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)?;
        if let Some(ref qualifier) = self.qualifier {
            write!(f, "-{}", qualifier)?;
        }
        Ok(())
    }
}
