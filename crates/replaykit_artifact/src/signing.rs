//! Artifact HMAC signing and verification.
//!
//! The signature covers the canonical compact form of
//! `{version, metadata, payload, checksum}`. Keys come from the embedding
//! environment and are never written into artifacts.

use crate::error::{ArtifactError, ArtifactResult};
use hmac::{Hmac, Mac};
use replaykit_canon::canonical_json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The only supported signature algorithm
pub const SIGNATURE_ALGORITHM: &str = "hmac-sha256";

/// Environment variable carrying the signing key
pub const SIGNING_KEY_ENV_VAR: &str = "REPLAYKIT_SIGNING_KEY";

/// Environment variable carrying the signing key id
pub const SIGNING_KEY_ID_ENV_VAR: &str = "REPLAYKIT_SIGNING_KEY_ID";

/// Outcome category of a signature verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    /// Signature present and valid
    Verified,
    /// No signature, and none was required
    UnsignedAllowed,
    /// Signature required but absent
    MissingSignature,
    /// Signature present but no key available to verify
    MissingKey,
    /// Signature present but does not match
    InvalidSignature,
    /// Signature algorithm not supported
    UnsupportedAlgorithm,
}

/// Structured signature verification result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureVerification {
    /// Whether the artifact may be trusted under the requested policy
    pub valid: bool,
    /// Outcome category
    pub status: SignatureStatus,
    /// One-line human message
    pub message: String,
    /// Declared algorithm, when a signature was present
    pub algorithm: Option<String>,
    /// Declared key id, when a signature was present
    pub key_id: Option<String>,
}

fn signature_payload(envelope: &Value) -> Value {
    json!({
        "version": envelope.get("version").cloned().unwrap_or(Value::Null),
        "metadata": envelope.get("metadata").cloned().unwrap_or(Value::Null),
        "payload": envelope.get("payload").cloned().unwrap_or(Value::Null),
        "checksum": envelope.get("checksum").cloned().unwrap_or(Value::Null),
    })
}

fn normalized_key(signing_key: &str) -> ArtifactResult<&[u8]> {
    let trimmed = signing_key.trim();
    if trimmed.is_empty() {
        return Err(ArtifactError::KeyMissing {
            message: "signing key cannot be empty".to_string(),
        });
    }
    Ok(trimmed.as_bytes())
}

/// Compute the hex HMAC digest for an envelope.
///
/// # Errors
///
/// Returns an error if the key is empty or serialization fails.
pub fn compute_artifact_hmac(envelope: &Value, signing_key: &str) -> ArtifactResult<String> {
    let key = normalized_key(signing_key)?;
    let payload = canonical_json(&signature_payload(envelope))?;
    let mut mac = HmacSha256::new_from_slice(key).map_err(|err| ArtifactError::KeyMissing {
        message: err.to_string(),
    })?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Attach a signature object to an envelope.
///
/// # Errors
///
/// Returns an error if the key is unusable or serialization fails.
pub fn sign_envelope(envelope: &mut Value, signing_key: &str, key_id: &str) -> ArtifactResult<()> {
    let digest = compute_artifact_hmac(envelope, signing_key)?;
    envelope["signature"] = json!({
        "algorithm": SIGNATURE_ALGORITHM,
        "key_id": key_id,
        "value": digest,
    });
    Ok(())
}

/// Verify an envelope signature, returning a structured status.
///
/// With `require_signature`, unsigned artifacts are invalid; otherwise they
/// verify as [`SignatureStatus::UnsignedAllowed`].
///
/// # Errors
///
/// Returns an error only for serialization failures; verification
/// outcomes, including mismatches, are reported in the result value.
pub fn verify_signature(
    envelope: &Value,
    signing_key: Option<&str>,
    require_signature: bool,
) -> ArtifactResult<SignatureVerification> {
    let signature = match envelope.get("signature").and_then(Value::as_object) {
        Some(signature) => signature,
        None => {
            if require_signature {
                return Ok(SignatureVerification {
                    valid: false,
                    status: SignatureStatus::MissingSignature,
                    message: "artifact is unsigned".to_string(),
                    algorithm: None,
                    key_id: None,
                });
            }
            return Ok(SignatureVerification {
                valid: true,
                status: SignatureStatus::UnsignedAllowed,
                message: "artifact is unsigned and unsigned artifacts are allowed".to_string(),
                algorithm: None,
                key_id: None,
            });
        }
    };

    let algorithm = signature
        .get("algorithm")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();
    let key_id = signature
        .get("key_id")
        .and_then(Value::as_str)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());
    let value = signature
        .get("value")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();

    if algorithm != SIGNATURE_ALGORITHM {
        return Ok(SignatureVerification {
            valid: false,
            status: SignatureStatus::UnsupportedAlgorithm,
            message: format!("unsupported signature algorithm: {algorithm}"),
            algorithm: Some(algorithm).filter(|a| !a.is_empty()),
            key_id,
        });
    }

    let Some(key) = signing_key else {
        return Ok(SignatureVerification {
            valid: false,
            status: SignatureStatus::MissingKey,
            message: format!(
                "signature key is required for verification; set {SIGNING_KEY_ENV_VAR}"
            ),
            algorithm: Some(algorithm),
            key_id,
        });
    };

    let normalized = normalized_key(key)?;
    let payload = canonical_json(&signature_payload(envelope))?;
    let mut mac = HmacSha256::new_from_slice(normalized).map_err(|err| ArtifactError::KeyMissing {
        message: err.to_string(),
    })?;
    mac.update(payload.as_bytes());

    let offered = hex::decode(&value).unwrap_or_default();
    if mac.verify_slice(&offered).is_err() {
        return Ok(SignatureVerification {
            valid: false,
            status: SignatureStatus::InvalidSignature,
            message: "artifact signature mismatch".to_string(),
            algorithm: Some(algorithm),
            key_id,
        });
    }

    Ok(SignatureVerification {
        valid: true,
        status: SignatureStatus::Verified,
        message: "artifact signature verified".to_string(),
        algorithm: Some(algorithm),
        key_id,
    })
}

/// Read the signing key and key id from the environment, if configured.
#[must_use]
pub fn signing_key_from_env() -> Option<(String, String)> {
    let key = std::env::var(SIGNING_KEY_ENV_VAR).ok()?;
    if key.trim().is_empty() {
        return None;
    }
    let key_id = std::env::var(SIGNING_KEY_ID_ENV_VAR)
        .ok()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| "default".to_string());
    Some((key, key_id))
}
