//! Content digests for header comparison and toolchain identities.

use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Hex SHA-256 of a file's contents.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {} for hashing", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("failed to hash {}", path.display()))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Whether two files have identical contents.
pub fn same_contents(a: &Path, b: &Path) -> Result<bool> {
    let len = |p: &Path| {
        p.metadata()
            .map(|m| m.len())
            .with_context(|| format!("failed to stat {}", p.display()))
    };
    if len(a)? != len(b)? {
        return Ok(false);
    }
    Ok(sha256_file(a)? == sha256_file(b)?)
}

/// Digest over an ordered list of string parts.
///
/// Parts are NUL-separated, so `["ab", "c"]` and `["a", "bc"]` differ.
#[derive(Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.hasher.update(s.as_bytes());
        self.hasher.update([0u8]);
        self
    }

    /// Full hex digest.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }

    /// First `len` hex characters of the digest.
    pub fn finish_prefix(self, len: usize) -> String {
        let mut hex = self.finish();
        hex.truncate(len);
        hex
    }
}
