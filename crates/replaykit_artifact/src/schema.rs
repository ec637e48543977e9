//! JSON-Schema validation for `.rpk` envelopes.
//!
//! Schemas are addressed by `(major, minor)`; unknown minor under a known
//! major falls back to the major's base schema. The published `1.0` schema
//! is embedded so validation works without an installed schema directory.

use crate::error::{ArtifactError, ArtifactResult};
use jsonschema::{Draft, JSONSchema};
use replaykit_core::ArtifactVersion;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// The embedded schema for artifact major version 1.
const SCHEMA_V1: &str = include_str!("../../../schemas/rpk-1.0.schema.json");

/// Compiled schema validator for one artifact version.
#[derive(Debug)]
pub struct SchemaValidator {
    compiled: JSONSchema,
}

impl SchemaValidator {
    /// Build a validator for an artifact version using the embedded schema.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::UnknownMajor`] for unsupported majors.
    pub fn for_version(version: &ArtifactVersion) -> ArtifactResult<Self> {
        if !version.is_reader_compatible() {
            return Err(ArtifactError::UnknownMajor {
                version: version.to_string(),
                supported: ArtifactVersion::SUPPORTED_MAJOR,
            });
        }
        let schema: Value = serde_json::from_str(SCHEMA_V1).map_err(|err| ArtifactError::InvalidJson {
            message: format!("embedded schema: {err}"),
        })?;
        Self::from_value(&schema)
    }

    /// Build a validator for an artifact version, preferring schema files
    /// under `schema_dir` (`rpk-<major>.<minor>.schema.json`, falling back
    /// to `rpk-<major>.0.schema.json`, then to the embedded schema).
    ///
    /// # Errors
    ///
    /// Returns an error for unsupported majors or unreadable schema files.
    pub fn for_version_in(version: &ArtifactVersion, schema_dir: &Path) -> ArtifactResult<Self> {
        if !version.is_reader_compatible() {
            return Err(ArtifactError::UnknownMajor {
                version: version.to_string(),
                supported: ArtifactVersion::SUPPORTED_MAJOR,
            });
        }
        let exact = schema_dir.join(schema_file_name(version));
        if exact.is_file() {
            return Self::from_file(&exact);
        }
        let base = schema_dir.join(schema_file_name(&ArtifactVersion::new(version.major, 0)));
        if base.is_file() {
            return Self::from_file(&base);
        }
        Self::for_version(version)
    }

    /// Load and compile a schema from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or compiled.
    pub fn from_file(path: &Path) -> ArtifactResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|err| ArtifactError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        let schema: Value = serde_json::from_str(&contents).map_err(|err| ArtifactError::InvalidJson {
            message: format!("schema {}: {err}", path.display()),
        })?;
        Self::from_value(&schema)
    }

    /// Compile a schema value.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema does not compile.
    pub fn from_value(schema: &Value) -> ArtifactResult<Self> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(schema)
            .map_err(|err| ArtifactError::SchemaViolation {
                location: "$".to_string(),
                message: format!("schema failed to compile: {err}"),
            })?;
        Ok(Self { compiled })
    }

    /// Validate an envelope, reporting the first violation.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::SchemaViolation`] with the JSON-pointer
    /// location of the first failing instance.
    pub fn validate(&self, artifact: &Value) -> ArtifactResult<()> {
        if let Err(mut errors) = self.compiled.validate(artifact) {
            if let Some(first) = errors.next() {
                let location = first.instance_path.to_string();
                return Err(ArtifactError::SchemaViolation {
                    location: if location.is_empty() { "$".to_string() } else { location },
                    message: first.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Schema file name for a version: `rpk-<major>.<minor>.schema.json`.
#[must_use]
pub fn schema_file_name(version: &ArtifactVersion) -> String {
    format!("rpk-{}.{}.schema.json", version.major, version.minor)
}

/// Conventional schema directory under an artifact root.
#[must_use]
pub fn schema_dir(artifact_root: &Path) -> PathBuf {
    artifact_root.join("schemas")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::build_envelope;
    use crate::model::{Run, Step};
    use replaykit_core::{RunId, StepId, StepType};
    use serde_json::{json, Map};

    fn valid_envelope() -> Value {
        let mut run = Run::new(RunId::new("run-schema-1"), "2026-02-21T00:00:00Z");
        run.steps.push(Step::new(
            StepId::from_counter(1),
            StepType::OutputFinal,
            json!({}),
            json!({"done": true}),
            Map::new(),
        ));
        build_envelope(&run, ArtifactVersion::CURRENT, &Map::new()).unwrap()
    }

    #[test]
    fn test_valid_envelope_passes() {
        let validator = SchemaValidator::for_version(&ArtifactVersion::CURRENT).unwrap();
        validator.validate(&valid_envelope()).unwrap();
    }

    #[test]
    fn test_unknown_major_rejected() {
        let err = SchemaValidator::for_version(&ArtifactVersion::new(2, 0)).unwrap_err();
        assert_eq!(err.machine_code(), "unknown_major");
    }

    #[test]
    fn test_unknown_minor_accepted() {
        assert!(SchemaValidator::for_version(&ArtifactVersion::new(1, 4)).is_ok());
    }

    #[test]
    fn test_missing_checksum_fails() {
        let mut envelope = valid_envelope();
        envelope.as_object_mut().unwrap().remove("checksum");
        let validator = SchemaValidator::for_version(&ArtifactVersion::CURRENT).unwrap();
        let err = validator.validate(&envelope).unwrap_err();
        assert_eq!(err.machine_code(), "schema_violation");
    }

    #[test]
    fn test_bad_step_type_fails() {
        let mut envelope = valid_envelope();
        envelope["payload"]["run"]["steps"][0]["type"] = json!("agent.command");
        let validator = SchemaValidator::for_version(&ArtifactVersion::CURRENT).unwrap();
        let err = validator.validate(&envelope).unwrap_err();
        match err {
            ArtifactError::SchemaViolation { location, .. } => {
                assert!(location.contains("/payload/run/steps/0"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_schema_file_name() {
        assert_eq!(schema_file_name(&ArtifactVersion::CURRENT), "rpk-1.0.schema.json");
        assert_eq!(schema_file_name(&ArtifactVersion::new(1, 3)), "rpk-1.3.schema.json");
    }
}
