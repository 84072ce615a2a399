//! SHA-256 digests for artifact verification.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

const DIGEST_HEX_LEN: usize = 64;

/// A validated, lowercase hex-encoded SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Parse a hex digest, accepting either case.
    ///
    /// Empty strings and placeholders such as `REPLACE_WITH_ACTUAL_SHA256`
    /// are rejected so that a release without real hashes cannot be
    /// installed unverified.
    pub fn parse(value: &str) -> Result<Self, String> {
        let value = value.trim();
        if value.is_empty() {
            return Err("sha256 is empty".to_string());
        }
        if value.len() != DIGEST_HEX_LEN {
            return Err(format!(
                "sha256 '{value}' must be {DIGEST_HEX_LEN} hex characters, got {}",
                value.len()
            ));
        }
        if let Some(bad) = value.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(format!("sha256 '{value}' contains non-hex character '{bad}'"));
        }
        Ok(Self(value.to_ascii_lowercase()))
    }

    /// Digest of `bytes`.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compare the digest of `bytes` against `expected`.
///
/// Returns the actual digest on mismatch.
pub fn verify(bytes: &[u8], expected: &Sha256Digest) -> Result<(), Sha256Digest> {
    let actual = Sha256Digest::of(bytes);
    if actual == *expected {
        Ok(())
    } else {
        Err(actual)
    }
}
