//! Schema migration: `0.9 -> 1.0` and `1.y -> 1.0` canonical rewrite.
//!
//! Every step hash is recomputed from canonical content; source hashes that
//! already match are counted as preserved.

use crate::envelope::{build_envelope, envelope_checksum};
use crate::error::{ArtifactError, MigrationError, MigrationResult};
use crate::io::{read_raw_envelope, write_envelope};
use crate::model::{Run, Step};
use crate::schema::SchemaValidator;
use replaykit_core::{ArtifactVersion, RunId, StepId, StepType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Whether the source artifact actually changed schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    /// Source was a prior schema and was rewritten
    Migrated,
    /// Source already carried the target version; canonical rewrite only
    AlreadyCurrent,
}

/// Summary of one migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSummary {
    /// Version the source artifact declared
    pub source_version: String,
    /// Version of the emitted artifact
    pub target_version: String,
    /// Run id found in the source
    pub source_run_id: String,
    /// Run id of the migrated artifact
    pub migrated_run_id: String,
    /// Steps in the migrated run
    pub total_steps: usize,
    /// Steps whose source hash already matched canonical content
    pub preserved_step_hashes: usize,
    /// Steps whose hash had to be recomputed
    pub recomputed_step_hashes: usize,
    /// Whether a schema change happened
    pub migration_status: MigrationStatus,
}

struct HashStats {
    preserved: usize,
    recomputed: usize,
}

/// Migrate an envelope to the current schema version.
///
/// # Errors
///
/// Returns `unsupported_version` for unknown source majors,
/// `malformed_payload` for shape problems, and `checksum_invalid` when the
/// source checksum does not verify.
pub fn migrate_envelope(source: &Value) -> MigrationResult<(Value, MigrationSummary)> {
    let source_version = version_string(source)?;
    let (run, stats) = run_from_source(source, &source_version)?;

    let status = if source_version == ArtifactVersion::CURRENT.to_string() {
        MigrationStatus::AlreadyCurrent
    } else {
        MigrationStatus::Migrated
    };

    let mut metadata = metadata_extras(source)?;
    metadata.insert(
        "migration_source_version".to_string(),
        Value::String(source_version.clone()),
    );
    metadata.insert(
        "migration_target_version".to_string(),
        Value::String(ArtifactVersion::CURRENT.to_string()),
    );
    metadata.insert(
        "migration_status".to_string(),
        serde_json::to_value(status).map_err(|err| MigrationError::MalformedPayload {
            message: err.to_string(),
        })?,
    );
    metadata.insert(
        "migration_preserved_step_hashes".to_string(),
        Value::from(stats.preserved),
    );
    metadata.insert(
        "migration_recomputed_step_hashes".to_string(),
        Value::from(stats.recomputed),
    );

    let migrated = build_envelope(&run, ArtifactVersion::CURRENT, &metadata)
        .map_err(MigrationError::from)?;

    let summary = MigrationSummary {
        source_version,
        target_version: ArtifactVersion::CURRENT.to_string(),
        source_run_id: source_run_id(source),
        migrated_run_id: run.id.to_string(),
        total_steps: run.step_count(),
        preserved_step_hashes: stats.preserved,
        recomputed_step_hashes: stats.recomputed,
        migration_status: status,
    };

    Ok((migrated, summary))
}

/// Migrate an artifact file and persist the result.
///
/// # Errors
///
/// Fails like [`migrate_envelope`], plus I/O errors.
pub fn migrate_file(source_path: &Path, out_path: &Path) -> MigrationResult<MigrationSummary> {
    let source = read_raw_envelope(source_path).map_err(MigrationError::from)?;
    let (migrated, summary) = migrate_envelope(&source)?;
    write_envelope(&migrated, out_path).map_err(MigrationError::from)?;
    tracing::info!(
        source = %source_path.display(),
        out = %out_path.display(),
        source_version = %summary.source_version,
        preserved = summary.preserved_step_hashes,
        recomputed = summary.recomputed_step_hashes,
        "artifact migrated"
    );
    Ok(summary)
}

fn version_string(source: &Value) -> MigrationResult<String> {
    let raw = source
        .get("version")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("");
    if raw.is_empty() {
        return Err(MigrationError::MalformedPayload {
            message: "source artifact is missing version".to_string(),
        });
    }
    Ok(raw.to_string())
}

fn run_from_source(source: &Value, source_version: &str) -> MigrationResult<(Run, HashStats)> {
    if source_version == ArtifactVersion::LEGACY.to_string() {
        validate_legacy_envelope(source)?;
        verify_source_checksum(source)?;
        return run_from_legacy(source);
    }

    let version = ArtifactVersion::parse(source_version).map_err(|_| {
        MigrationError::UnsupportedVersion {
            version: source_version.to_string(),
        }
    })?;
    if version.major != ArtifactVersion::SUPPORTED_MAJOR {
        return Err(MigrationError::UnsupportedVersion {
            version: source_version.to_string(),
        });
    }

    let validator = SchemaValidator::for_version(&version).map_err(MigrationError::from)?;
    validator
        .validate(source)
        .map_err(|err| MigrationError::MalformedPayload {
            message: err.to_string(),
        })?;
    verify_source_checksum(source)?;
    run_from_v1(source)
}

fn verify_source_checksum(source: &Value) -> MigrationResult<()> {
    let expected = envelope_checksum(source).map_err(MigrationError::from)?;
    let actual = source
        .get("checksum")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    if actual != expected {
        return Err(MigrationError::ChecksumInvalid { expected, actual });
    }
    Ok(())
}

fn validate_legacy_envelope(source: &Value) -> MigrationResult<()> {
    for key in ["metadata", "payload", "checksum"] {
        if source.get(key).is_none() {
            return Err(MigrationError::MalformedPayload {
                message: format!("legacy artifact missing required root key: {key}"),
            });
        }
    }
    let run = source.pointer("/payload/run");
    let Some(run) = run.and_then(Value::as_object) else {
        return Err(MigrationError::MalformedPayload {
            message: "legacy artifact payload.run must be an object".to_string(),
        });
    };
    for key in ["id", "timestamp", "steps"] {
        if !run.contains_key(key) {
            return Err(MigrationError::MalformedPayload {
                message: format!("legacy artifact payload.run missing key: {key}"),
            });
        }
    }
    if !run.get("steps").is_some_and(Value::is_array) {
        return Err(MigrationError::MalformedPayload {
            message: "legacy artifact payload.run.steps must be an array".to_string(),
        });
    }
    Ok(())
}

fn run_from_v1(source: &Value) -> MigrationResult<(Run, HashStats)> {
    let run_raw = required_run_object(source)?;
    let steps_raw = run_raw.get("steps").and_then(Value::as_array).cloned().unwrap_or_default();

    let mut stats = HashStats {
        preserved: 0,
        recomputed: 0,
    };
    let mut steps = Vec::with_capacity(steps_raw.len());
    for step_raw in &steps_raw {
        let step = migrated_step(step_raw, "input", "output", "hash", &mut stats)?;
        steps.push(step);
    }

    let run = Run {
        id: RunId::new(string_field(run_raw, "id")),
        timestamp: string_field(run_raw, "timestamp"),
        environment_fingerprint: object_field(run_raw, "environment_fingerprint"),
        runtime_versions: object_field(run_raw, "runtime_versions"),
        steps,
    };
    Ok((run, stats))
}

fn run_from_legacy(source: &Value) -> MigrationResult<(Run, HashStats)> {
    let run_raw = required_run_object(source)?;
    let steps_raw = run_raw.get("steps").and_then(Value::as_array).cloned().unwrap_or_default();

    let mut stats = HashStats {
        preserved: 0,
        recomputed: 0,
    };
    let mut steps = Vec::with_capacity(steps_raw.len());
    for step_raw in &steps_raw {
        let step = migrated_step(step_raw, "request", "response", "step_hash", &mut stats)?;
        steps.push(step);
    }

    let run = Run {
        id: RunId::new(string_field(run_raw, "id")),
        timestamp: string_field(run_raw, "timestamp"),
        environment_fingerprint: object_field(run_raw, "env_fingerprint"),
        runtime_versions: object_field(run_raw, "runtime"),
        steps,
    };
    Ok((run, stats))
}

/// Build a current-schema step from a raw step object, counting hash
/// preservation. `input`/`output` fall back to the legacy field names and
/// `hash` to the legacy hash key.
fn migrated_step(
    step_raw: &Value,
    legacy_input_key: &str,
    legacy_output_key: &str,
    legacy_hash_key: &str,
    stats: &mut HashStats,
) -> MigrationResult<Step> {
    let Some(raw) = step_raw.as_object() else {
        return Err(MigrationError::MalformedPayload {
            message: "step entries must be objects".to_string(),
        });
    };

    let type_raw = raw.get("type").and_then(Value::as_str).unwrap_or("");
    let step_type = StepType::parse(type_raw).map_err(|_| MigrationError::MalformedPayload {
        message: format!("unsupported step type: {type_raw:?}"),
    })?;

    let id_raw = raw.get("id").and_then(Value::as_str).unwrap_or("");
    let id = StepId::parse(id_raw).map_err(|_| MigrationError::MalformedPayload {
        message: format!("invalid step id: {id_raw:?}"),
    })?;

    let input = raw
        .get("input")
        .or_else(|| raw.get(legacy_input_key))
        .cloned()
        .unwrap_or(Value::Null);
    let output = raw
        .get("output")
        .or_else(|| raw.get(legacy_output_key))
        .cloned()
        .unwrap_or(Value::Null);
    let metadata = raw
        .get("metadata")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let step = Step::new(id, step_type, input, output, metadata)
        .with_hash()
        .map_err(|err| MigrationError::RecomputeFailed {
            message: err.to_string(),
        })?;

    let source_hash = raw
        .get(legacy_hash_key)
        .or_else(|| raw.get("hash"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|hash| !hash.is_empty());
    if source_hash.is_some() && source_hash == step.hash.as_deref() {
        stats.preserved += 1;
    } else {
        stats.recomputed += 1;
    }
    Ok(step)
}

fn required_run_object(source: &Value) -> MigrationResult<&Map<String, Value>> {
    source
        .pointer("/payload/run")
        .and_then(Value::as_object)
        .ok_or_else(|| MigrationError::MalformedPayload {
            message: "artifact payload.run must be an object".to_string(),
        })
}

fn string_field(map: &Map<String, Value>, key: &str) -> String {
    map.get(key).and_then(Value::as_str).unwrap_or("").to_string()
}

fn object_field(map: &Map<String, Value>, key: &str) -> Map<String, Value> {
    map.get(key).and_then(Value::as_object).cloned().unwrap_or_default()
}

fn metadata_extras(source: &Value) -> MigrationResult<Map<String, Value>> {
    let Some(metadata) = source.get("metadata").and_then(Value::as_object) else {
        return Err(MigrationError::MalformedPayload {
            message: "artifact metadata must be an object".to_string(),
        });
    };
    Ok(metadata
        .iter()
        .filter(|(key, _)| key.as_str() != "run_id" && key.as_str() != "created_at")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect())
}

fn source_run_id(source: &Value) -> String {
    if let Some(id) = source.pointer("/payload/run/id").and_then(Value::as_str) {
        return id.to_string();
    }
    if let Some(id) = source.pointer("/metadata/run_id").and_then(Value::as_str) {
        return id.to_string();
    }
    "<unknown>".to_string()
}
