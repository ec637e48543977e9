//! Bundle export: re-emit an artifact with a redaction profile applied.
//!
//! Bundles are replay-compatible artifacts; every step is re-redacted and
//! re-hashed, and the envelope records the profile for audit.

use crate::error::{ReplayKitError, ReplayKitResult};
use replaykit_artifact::{read_artifact, write_artifact_with, Run, SigningRequest, Step, WriteOptions};
use replaykit_redact::{redact_value, RedactionPolicy};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

/// Options for a bundle export.
#[derive(Debug, Clone, Default)]
pub struct BundleOptions {
    /// Named redaction profile: `default` or `none`. Ignored when an
    /// explicit policy is supplied.
    pub profile: Option<String>,
    /// Explicit redaction policy overriding the named profile
    pub policy: Option<RedactionPolicy>,
    /// Label recorded for an explicit policy (defaults to `custom`)
    pub policy_label: Option<String>,
    /// Optional signature for the emitted bundle
    pub signing: Option<SigningRequest>,
}

/// Outcome of a bundle export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleOutcome {
    /// Where the bundle was written
    pub out_path: PathBuf,
    /// Run id of the source artifact
    pub source_run_id: String,
    /// Profile recorded in the bundle
    pub redaction_profile: String,
    /// Redaction policy version recorded for audit
    pub redaction_policy_version: String,
}

/// Resolve a named redaction profile.
///
/// # Errors
///
/// Returns an error for unknown profile names.
pub fn resolve_redaction_profile(profile: &str) -> ReplayKitResult<(String, RedactionPolicy)> {
    match profile.trim().to_ascii_lowercase().as_str() {
        "default" => Ok(("default".to_string(), RedactionPolicy::standard())),
        "none" => Ok(("none".to_string(), RedactionPolicy::disabled())),
        _ => Err(ReplayKitError::UnknownRedactionProfile {
            profile: profile.to_string(),
        }),
    }
}

/// Apply a redaction policy to a whole run, re-hashing every step.
///
/// # Errors
///
/// Returns an error if step hashing fails.
pub fn redact_run_for_bundle(run: &Run, policy: &RedactionPolicy) -> ReplayKitResult<Run> {
    let mut redacted_steps = Vec::with_capacity(run.steps.len());
    for step in &run.steps {
        let metadata = match redact_value(&Value::Object(step.metadata.clone()), policy) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let redacted = Step::new(
            step.id.clone(),
            step.step_type,
            redact_value(&step.input, policy),
            redact_value(&step.output, policy),
            metadata,
        )
        .with_hash()
        .map_err(ReplayKitError::from)?;
        redacted_steps.push(redacted);
    }

    let environment = match redact_value(&Value::Object(run.environment_fingerprint.clone()), policy)
    {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let runtime = match redact_value(&Value::Object(run.runtime_versions.clone()), policy) {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    Ok(Run {
        id: run.id.clone(),
        timestamp: run.timestamp.clone(),
        environment_fingerprint: environment,
        runtime_versions: runtime,
        steps: redacted_steps,
    })
}

/// Re-emit an artifact with a redaction profile applied.
///
/// # Errors
///
/// Returns an error for unknown profiles or artifact I/O failures.
pub fn bundle(source: &Path, out: &Path, options: &BundleOptions) -> ReplayKitResult<BundleOutcome> {
    let source_run = read_artifact(source)?;

    let (profile_name, policy) = match &options.policy {
        Some(policy) => {
            let label = options
                .policy_label
                .as_deref()
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .unwrap_or("custom")
                .to_ascii_lowercase();
            (label, policy.clone())
        }
        None => resolve_redaction_profile(options.profile.as_deref().unwrap_or("default"))?,
    };

    let bundled_run = redact_run_for_bundle(&source_run, &policy)?;

    let mut metadata = Map::new();
    metadata.insert("bundle".to_string(), Value::Bool(true));
    metadata.insert(
        "source_run_id".to_string(),
        json!(source_run.id.to_string()),
    );
    metadata.insert("redaction_profile".to_string(), json!(profile_name));
    metadata.insert("redaction_policy_version".to_string(), json!(policy.version()));

    write_artifact_with(
        &bundled_run,
        out,
        &WriteOptions {
            metadata,
            signing: options.signing.clone(),
            ..WriteOptions::default()
        },
    )?;
    tracing::info!(
        source_run_id = %source_run.id,
        profile = %profile_name,
        out = %out.display(),
        "bundle written"
    );

    Ok(BundleOutcome {
        out_path: out.to_path_buf(),
        source_run_id: source_run.id.to_string(),
        redaction_profile: profile_name,
        redaction_policy_version: policy.version().to_string(),
    })
}
