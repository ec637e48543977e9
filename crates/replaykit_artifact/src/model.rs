//! Run and step data models.

use replaykit_canon::{compute_step_hash, CanonResult};
use replaykit_core::{RunId, StepId, StepType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single recorded boundary event inside a run.
///
/// The hash is a pure function of `type` plus the canonical forms of
/// `input`, `output`, and volatile-stripped `metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Monotonic identifier within the run (`step-NNNNNN`)
    pub id: StepId,
    /// Boundary event kind
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// Canonical nested input value
    pub input: Value,
    /// Canonical nested output value
    pub output: Value,
    /// Step metadata mapping
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Content hash (`sha256:` + 64 lowercase hex), absent only pre-finalization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl Step {
    /// Create an unhashed step.
    #[must_use]
    pub fn new(
        id: StepId,
        step_type: StepType,
        input: Value,
        output: Value,
        metadata: Map<String, Value>,
    ) -> Self {
        Self {
            id,
            step_type,
            input,
            output,
            metadata,
            hash: None,
        }
    }

    /// Compute the deterministic hash of this step's content.
    ///
    /// # Errors
    ///
    /// Returns an error if canonical serialization fails.
    pub fn computed_hash(&self) -> CanonResult<String> {
        compute_step_hash(
            self.step_type.as_str(),
            &self.input,
            &self.output,
            &Value::Object(self.metadata.clone()),
        )
    }

    /// Return a copy with the deterministic hash filled in.
    ///
    /// # Errors
    ///
    /// Returns an error if canonical serialization fails.
    pub fn with_hash(&self) -> CanonResult<Self> {
        let mut hashed = self.clone();
        hashed.hash = Some(self.computed_hash()?);
        Ok(hashed)
    }
}

/// An ordered run of AI workflow steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Stable run identifier
    pub id: RunId,
    /// UTC ISO-8601 capture timestamp
    pub timestamp: String,
    /// Host and platform description
    #[serde(default)]
    pub environment_fingerprint: Map<String, Value>,
    /// Toolchain and library versions
    #[serde(default)]
    pub runtime_versions: Map<String, Value>,
    /// Ordered steps, totally ordered by insertion
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Run {
    /// Create an empty run.
    #[must_use]
    pub fn new(id: RunId, timestamp: impl Into<String>) -> Self {
        Self {
            id,
            timestamp: timestamp.into(),
            environment_fingerprint: Map::new(),
            runtime_versions: Map::new(),
            steps: Vec::new(),
        }
    }

    /// Return a copy with every step hash computed.
    ///
    /// # Errors
    ///
    /// Returns an error if canonical serialization fails.
    pub fn with_hashed_steps(&self) -> CanonResult<Self> {
        let mut hashed = self.clone();
        hashed.steps = self
            .steps
            .iter()
            .map(Step::with_hash)
            .collect::<CanonResult<Vec<_>>>()?;
        Ok(hashed)
    }

    /// Number of steps in the run.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_step() -> Step {
        let metadata = match json!({"model": "m1", "duration_ms": 42}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        Step::new(
            StepId::from_counter(1),
            StepType::ModelResponse,
            json!({"prompt": "hi"}),
            json!({"content": "hello"}),
            metadata,
        )
    }

    #[test]
    fn test_step_with_hash() {
        let step = sample_step().with_hash().unwrap();
        let hash = step.hash.clone().unwrap();
        assert!(hash.starts_with("sha256:"));
        assert_eq!(hash, step.computed_hash().unwrap());
    }

    #[test]
    fn test_step_serde_roundtrip() {
        let step = sample_step().with_hash().unwrap();
        let raw = serde_json::to_value(&step).unwrap();
        assert_eq!(raw["type"], json!("model.response"));
        let back: Step = serde_json::from_value(raw).unwrap();
        assert_eq!(back, step);
    }

    #[test]
    fn test_run_with_hashed_steps() {
        let mut run = Run::new(RunId::new("run-1"), "2026-02-21T00:00:00Z");
        run.steps.push(sample_step());
        let hashed = run.with_hashed_steps().unwrap();
        assert_eq!(hashed.step_count(), 1);
        assert!(hashed.steps[0].hash.is_some());
        // Original is untouched.
        assert!(run.steps[0].hash.is_none());
    }

    #[test]
    fn test_run_serde_defaults() {
        let raw = json!({
            "id": "run-min",
            "timestamp": "2026-02-21T00:00:00Z",
        });
        let run: Run = serde_json::from_value(raw).unwrap();
        assert_eq!(run.step_count(), 0);
        assert!(run.environment_fingerprint.is_empty());
    }
}
