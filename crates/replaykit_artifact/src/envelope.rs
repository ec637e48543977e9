//! Envelope construction and integrity helpers.
//!
//! The checksum covers the canonical compact form of
//! `{version, metadata, payload}`; `checksum` and `signature` themselves
//! are excluded.

use crate::error::{ArtifactError, ArtifactResult};
use crate::model::Run;
use replaykit_canon::canonical_digest;
use replaykit_core::ArtifactVersion;
use serde_json::{json, Map, Value};

/// Build a complete envelope for a run: hash steps, stamp metadata,
/// compute the checksum.
///
/// # Errors
///
/// Returns an error if hashing or serialization fails.
pub fn build_envelope(
    run: &Run,
    version: ArtifactVersion,
    extra_metadata: &Map<String, Value>,
) -> ArtifactResult<Value> {
    let hashed = run.with_hashed_steps()?;

    let mut metadata = Map::new();
    metadata.insert("run_id".to_string(), Value::String(run.id.to_string()));
    metadata.insert("created_at".to_string(), Value::String(run.timestamp.clone()));
    for (key, value) in extra_metadata {
        metadata.insert(key.clone(), value.clone());
    }

    let run_value = serde_json::to_value(&hashed).map_err(|err| ArtifactError::InvalidJson {
        message: err.to_string(),
    })?;

    let mut envelope = json!({
        "version": version.to_string(),
        "metadata": Value::Object(metadata),
        "payload": {"run": run_value},
    });

    let checksum = envelope_checksum(&envelope)?;
    envelope["checksum"] = Value::String(checksum);
    Ok(envelope)
}

/// Compute the checksum of an envelope from its integrity-relevant fields.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn envelope_checksum(envelope: &Value) -> ArtifactResult<String> {
    let subject = json!({
        "version": envelope.get("version").cloned().unwrap_or(Value::Null),
        "metadata": envelope.get("metadata").cloned().unwrap_or(Value::Null),
        "payload": envelope.get("payload").cloned().unwrap_or(Value::Null),
    });
    Ok(canonical_digest(&subject)?)
}

/// Verify that the stored checksum matches the recomputed one.
///
/// # Errors
///
/// Returns [`ArtifactError::ChecksumMismatch`] on any difference.
pub fn verify_checksum(envelope: &Value) -> ArtifactResult<()> {
    let expected = envelope_checksum(envelope)?;
    let actual = envelope
        .get("checksum")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    if actual != expected {
        return Err(ArtifactError::ChecksumMismatch { expected, actual });
    }
    Ok(())
}

/// Parse the envelope's version field.
///
/// # Errors
///
/// Returns an error if the field is absent or malformed.
pub fn envelope_version(envelope: &Value) -> ArtifactResult<ArtifactVersion> {
    let raw = envelope.get("version").and_then(Value::as_str).unwrap_or("");
    ArtifactVersion::parse(raw).map_err(|_| ArtifactError::SchemaViolation {
        location: "/version".to_string(),
        message: format!("invalid artifact version: {raw:?}"),
    })
}

/// Construct a typed run from a validated envelope.
///
/// # Errors
///
/// Returns an error if the payload does not deserialize as a run.
pub fn run_from_envelope(envelope: &Value) -> ArtifactResult<Run> {
    let run_value = envelope
        .pointer("/payload/run")
        .cloned()
        .ok_or_else(|| ArtifactError::SchemaViolation {
            location: "/payload/run".to_string(),
            message: "payload.run must be an object".to_string(),
        })?;
    serde_json::from_value(run_value).map_err(|err| ArtifactError::SchemaViolation {
        location: "/payload/run".to_string(),
        message: err.to_string(),
    })
}
