//! Content hashing over canonical bytes.
//!
//! All digests are SHA-256, encoded as `sha256:` plus 64 lowercase hex
//! characters.

use crate::error::{CanonError, CanonResult};
use crate::json::{canonical_json, canonical_json_with};
use crate::value::{canonicalize, canonicalize_with, CanonOptions};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// Prefix carried by every encoded digest
pub const HASH_PREFIX: &str = "sha256:";

/// A SHA-256 digest (256 bits / 32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sha256Digest([u8; 32]);

impl Sha256Digest {
    /// The number of bytes in a digest
    pub const LEN: usize = 32;

    /// Compute the digest of raw bytes
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Raw digest bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encode as `sha256:<hex>`
    #[must_use]
    pub fn to_prefixed(&self) -> String {
        format!("{HASH_PREFIX}{}", hex::encode(self.0))
    }

    /// Parse a `sha256:<hex>` string
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix or hex payload is malformed.
    pub fn parse_prefixed(value: &str) -> CanonResult<Self> {
        let hex_part = value.strip_prefix(HASH_PREFIX).ok_or_else(|| CanonError::Serialize {
            message: format!("digest missing {HASH_PREFIX} prefix: {value}"),
        })?;
        let bytes = hex::decode(hex_part).map_err(|_| CanonError::Serialize {
            message: format!("digest is not valid hex: {value}"),
        })?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| CanonError::Serialize {
            message: format!("digest must be {} bytes: {value}", Self::LEN),
        })?;
        Ok(Self(arr))
    }

    /// Check that the digest matches the given bytes
    #[must_use]
    pub fn verify(&self, data: &[u8]) -> bool {
        Self::compute(data) == *self
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_prefixed())
    }
}

/// Digest of a value's compact canonical JSON, prefixed.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn canonical_digest(value: &Value) -> CanonResult<String> {
    let payload = canonical_json(value)?;
    Ok(Sha256Digest::compute(payload.as_bytes()).to_prefixed())
}

/// Compute the deterministic hash of a step.
///
/// The hash input is the canonical mapping `{type, input, output, metadata}`
/// with the volatile denylist stripped from metadata at all depths.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn compute_step_hash(
    step_type: &str,
    input: &Value,
    output: &Value,
    metadata: &Value,
) -> CanonResult<String> {
    let hash_input = json!({
        "type": step_type,
        "input": canonicalize(input),
        "output": canonicalize(output),
        "metadata": canonicalize_with(metadata, &CanonOptions { strip_volatile: true }),
    });
    let payload = canonical_json_with(&hash_input, &CanonOptions::default())?;
    Ok(Sha256Digest::compute(payload.as_bytes()).to_prefixed())
}
