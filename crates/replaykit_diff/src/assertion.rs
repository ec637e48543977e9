//! Baseline vs candidate assertion semantics over the diff engine.

use crate::engine::{diff_runs, DiffOptions};
use crate::models::{RunDiffResult, ValueDelta};
use crate::performance::{evaluate_slowdown_gate, SlowdownGateResult};
use replaykit_artifact::Run;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Options for one assertion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssertOptions {
    /// Also fail on fingerprint/runtime drift and volatile metadata drift
    pub strict: bool,
    /// Per-step delta cap forwarded to the diff engine
    pub max_changes_per_step: usize,
    /// Slowdown gate threshold in percent; `None` disables the gate
    pub slowdown_threshold_pct: Option<f64>,
}

impl Default for AssertOptions {
    fn default() -> Self {
        Self {
            strict: false,
            max_changes_per_step: 32,
            slowdown_threshold_pct: None,
        }
    }
}

/// Terminal status of an assertion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionStatus {
    /// No divergence under the selected rules
    Pass,
    /// Divergence, drift, or gate failure
    Fail,
}

/// Outcome of a baseline vs candidate assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionOutcome {
    /// Terminal status
    pub status: AssertionStatus,
    /// The underlying diff
    pub diff: RunDiffResult,
    /// Run-level drift findings (strict mode)
    pub drift: Vec<ValueDelta>,
    /// Slowdown gate result, when the gate was requested
    pub performance: Option<SlowdownGateResult>,
}

impl AssertionOutcome {
    /// Whether the assertion passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == AssertionStatus::Pass
    }

    /// Process exit code for tools built on this assertion.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }

    /// Render the outcome as a JSON value for stable tool output.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Compare a baseline and a candidate run.
///
/// Pass iff the diff is identical, no strict drift is found, and the
/// slowdown gate (when requested) holds.
#[must_use]
pub fn assert_runs(baseline: &Run, candidate: &Run, options: &AssertOptions) -> AssertionOutcome {
    let diff = diff_runs(
        baseline,
        candidate,
        &DiffOptions {
            first_only: false,
            max_changes_per_step: options.max_changes_per_step.max(1),
            strict: options.strict,
        },
    );

    let mut drift = Vec::new();
    if options.strict {
        collect_run_drift(baseline, candidate, &mut drift);
    }

    let performance = options
        .slowdown_threshold_pct
        .map(|threshold| evaluate_slowdown_gate(baseline, candidate, Some(threshold)));
    let gate_failed = performance.as_ref().is_some_and(|gate| gate.gate_failed);

    let passed = diff.identical() && drift.is_empty() && !gate_failed;
    let outcome = AssertionOutcome {
        status: if passed {
            AssertionStatus::Pass
        } else {
            AssertionStatus::Fail
        },
        diff,
        drift,
        performance,
    };
    tracing::debug!(
        baseline = %outcome.diff.left_run_id,
        candidate = %outcome.diff.right_run_id,
        passed,
        "assertion evaluated"
    );
    outcome
}

fn collect_run_drift(baseline: &Run, candidate: &Run, out: &mut Vec<ValueDelta>) {
    collect_mapping_drift(
        "/environment_fingerprint",
        &baseline.environment_fingerprint,
        &candidate.environment_fingerprint,
        out,
    );
    collect_mapping_drift(
        "/runtime_versions",
        &baseline.runtime_versions,
        &candidate.runtime_versions,
        out,
    );
}

fn collect_mapping_drift(
    root: &str,
    left: &serde_json::Map<String, Value>,
    right: &serde_json::Map<String, Value>,
    out: &mut Vec<ValueDelta>,
) {
    let keys: std::collections::BTreeSet<&String> = left.keys().chain(right.keys()).collect();
    for key in keys {
        let left_value = left.get(key.as_str());
        let right_value = right.get(key.as_str());
        if left_value != right_value {
            out.push(ValueDelta::new(
                format!("{root}/{key}"),
                left_value.cloned(),
                right_value.cloned(),
            ));
        }
    }
}
