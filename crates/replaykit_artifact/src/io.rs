//! Artifact file read/write.
//!
//! Writes are atomic: the envelope is rendered to a temp sibling, synced,
//! then renamed over the target. Abrupt termination leaves either the
//! prior artifact or a complete new one, never a partial file.

use crate::envelope::{build_envelope, envelope_version, run_from_envelope, verify_checksum};
use crate::error::{ArtifactError, ArtifactResult};
use crate::model::Run;
use crate::schema::SchemaValidator;
use crate::signing::{sign_envelope, verify_signature, SignatureVerification};
use replaykit_canon::canonical_json_pretty;
use replaykit_core::ArtifactVersion;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::Path;

/// A signing key plus its published id.
#[derive(Debug, Clone)]
pub struct SigningRequest {
    /// HMAC key material (never persisted)
    pub key: String,
    /// Key id written into the signature object
    pub key_id: String,
}

/// Options for writing an artifact.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Schema version to stamp
    pub version: ArtifactVersion,
    /// Extra envelope metadata merged over `run_id`/`created_at`
    pub metadata: Map<String, Value>,
    /// Optional signature
    pub signing: Option<SigningRequest>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            version: ArtifactVersion::CURRENT,
            metadata: Map::new(),
            signing: None,
        }
    }
}

/// Write a run as an artifact with default options.
///
/// # Errors
///
/// Returns an error if envelope construction or I/O fails.
pub fn write_artifact(run: &Run, path: &Path) -> ArtifactResult<Value> {
    write_artifact_with(run, path, &WriteOptions::default())
}

/// Write a run as an artifact.
///
/// Returns the envelope that was persisted.
///
/// # Errors
///
/// Returns an error if envelope construction, signing, or I/O fails.
pub fn write_artifact_with(run: &Run, path: &Path, options: &WriteOptions) -> ArtifactResult<Value> {
    let mut envelope = build_envelope(run, options.version, &options.metadata)?;
    if let Some(signing) = &options.signing {
        sign_envelope(&mut envelope, &signing.key, &signing.key_id)?;
    }
    write_envelope(&envelope, path)?;
    tracing::debug!(
        run_id = %run.id,
        steps = run.step_count(),
        path = %path.display(),
        "artifact written"
    );
    Ok(envelope)
}

/// Persist an already-built envelope in the on-disk canonical form.
///
/// # Errors
///
/// Returns an error if serialization or I/O fails.
pub fn write_envelope(envelope: &Value, path: &Path) -> ArtifactResult<()> {
    let rendered = canonical_json_pretty(envelope)?;
    atomic_write(path, rendered.as_bytes())
}

/// Read and fully verify an artifact: parse, schema, checksum.
///
/// # Errors
///
/// Fails fast with a distinct error kind at the first violated stage.
pub fn read_artifact(path: &Path) -> ArtifactResult<Run> {
    let envelope = read_raw_envelope(path)?;
    let version = envelope_version(&envelope)?;
    let validator = SchemaValidator::for_version(&version)?;
    validator.validate(&envelope)?;
    verify_checksum(&envelope)?;
    run_from_envelope(&envelope)
}

/// Read and verify an artifact, additionally checking its signature.
///
/// # Errors
///
/// Fails like [`read_artifact`]; additionally fails with a signature error
/// kind when the signature does not satisfy the requested policy.
pub fn read_artifact_verified(
    path: &Path,
    signing_key: Option<&str>,
    require_signature: bool,
) -> ArtifactResult<(Run, SignatureVerification)> {
    let envelope = read_raw_envelope(path)?;
    let version = envelope_version(&envelope)?;
    let validator = SchemaValidator::for_version(&version)?;
    validator.validate(&envelope)?;
    verify_checksum(&envelope)?;
    let verification = verify_signature(&envelope, signing_key, require_signature)?;
    if !verification.valid {
        return Err(match verification.status {
            crate::signing::SignatureStatus::MissingSignature => ArtifactError::SignatureMissing,
            crate::signing::SignatureStatus::MissingKey => ArtifactError::KeyMissing {
                message: verification.message.clone(),
            },
            crate::signing::SignatureStatus::UnsupportedAlgorithm => {
                ArtifactError::UnsupportedSignatureAlgorithm {
                    algorithm: verification.algorithm.clone().unwrap_or_default(),
                }
            }
            _ => ArtifactError::SignatureMismatch,
        });
    }
    let run = run_from_envelope(&envelope)?;
    Ok((run, verification))
}

/// Read an envelope without verification. Used by migration, which applies
/// version-adaptive checks of its own.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_raw_envelope(path: &Path) -> ArtifactResult<Value> {
    let contents = fs::read_to_string(path).map_err(|err| ArtifactError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    serde_json::from_str(&contents).map_err(|err| ArtifactError::InvalidJson {
        message: err.to_string(),
    })
}

fn atomic_write(path: &Path, contents: &[u8]) -> ArtifactResult<()> {
    let io_err = |err: std::io::Error| ArtifactError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp_path = std::path::PathBuf::from(temp);

    let mut file = fs::File::create(&temp_path).map_err(io_err)?;
    file.write_all(contents).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    drop(file);

    fs::rename(&temp_path, path).map_err(io_err)
}
