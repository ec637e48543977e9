//! Slowdown gate: aggregate duration drift between two runs.

use replaykit_artifact::{Run, Step};
use replaykit_canon::DURATION_METADATA_KEYS;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Aggregate duration metadata extracted from a run's steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingSummary {
    /// Sum of step durations in milliseconds
    pub total_duration_ms: f64,
    /// Steps that carried a duration key
    pub measured_steps: usize,
    /// Steps with no usable duration metadata
    pub missing_steps: usize,
}

/// Outcome category of the slowdown gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlowdownGateStatus {
    /// No threshold was requested
    NotRequested,
    /// Aggregate increase stayed within the threshold
    WithinThreshold,
    /// Aggregate increase exceeded the threshold
    Slowdown,
    /// Gate requested but duration metadata is absent
    MissingMetrics,
}

/// Result of evaluating the slowdown gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowdownGateResult {
    /// Outcome category
    pub status: SlowdownGateStatus,
    /// Requested threshold in percent, if any
    pub threshold_percent: Option<f64>,
    /// Measured aggregate increase in percent, when computable
    pub slowdown_percent: Option<f64>,
    /// Whether the gate fails the assertion
    pub gate_failed: bool,
    /// One-line human message
    pub message: String,
    /// Baseline timing
    pub baseline: TimingSummary,
    /// Candidate timing
    pub candidate: TimingSummary,
}

/// Extract a step's duration in milliseconds from the first present key
/// among `duration_ms`, `latency_ms`, `wall_time_ms`, `elapsed_ms`.
#[must_use]
pub fn extract_step_duration_ms(step: &Step) -> Option<f64> {
    for key in DURATION_METADATA_KEYS {
        let Some(raw) = step.metadata.get(*key) else {
            continue;
        };
        let Some(value) = duration_value(raw) else {
            continue;
        };
        if value >= 0.0 {
            return Some(value);
        }
    }
    None
}

fn duration_value(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(number) => number.as_f64().filter(|value| value.is_finite()),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|value| value.is_finite()),
        _ => None,
    }
}

/// Summarize step-level duration metadata for a run.
#[must_use]
pub fn summarize_run_timing(run: &Run) -> TimingSummary {
    let mut total = 0.0;
    let mut measured = 0;
    let mut missing = 0;
    for step in &run.steps {
        match extract_step_duration_ms(step) {
            Some(duration) => {
                total += duration;
                measured += 1;
            }
            None => missing += 1,
        }
    }
    TimingSummary {
        total_duration_ms: total,
        measured_steps: measured,
        missing_steps: missing,
    }
}

/// Evaluate candidate slowdown against a baseline.
///
/// With no threshold the gate reports `not_requested` and never fails.
/// A requested gate with unmeasurable timings fails with `missing_metrics`.
#[must_use]
pub fn evaluate_slowdown_gate(
    baseline_run: &Run,
    candidate_run: &Run,
    threshold_percent: Option<f64>,
) -> SlowdownGateResult {
    let baseline = summarize_run_timing(baseline_run);
    let candidate = summarize_run_timing(candidate_run);

    let Some(threshold) = threshold_percent else {
        return SlowdownGateResult {
            status: SlowdownGateStatus::NotRequested,
            threshold_percent: None,
            slowdown_percent: None,
            gate_failed: false,
            message: "slowdown gate not requested".to_string(),
            baseline,
            candidate,
        };
    };

    if baseline.measured_steps == 0
        || candidate.measured_steps == 0
        || baseline.total_duration_ms <= 0.0
    {
        return SlowdownGateResult {
            status: SlowdownGateStatus::MissingMetrics,
            threshold_percent: Some(threshold),
            slowdown_percent: None,
            gate_failed: true,
            message: "slowdown gate requested but duration metadata is missing; populate step \
                      metadata with duration_ms/latency_ms/wall_time_ms/elapsed_ms"
                .to_string(),
            baseline,
            candidate,
        };
    }

    let slowdown_percent =
        (candidate.total_duration_ms - baseline.total_duration_ms) / baseline.total_duration_ms * 100.0;
    let exceeded = slowdown_percent > threshold;

    SlowdownGateResult {
        status: if exceeded {
            SlowdownGateStatus::Slowdown
        } else {
            SlowdownGateStatus::WithinThreshold
        },
        threshold_percent: Some(threshold),
        slowdown_percent: Some(slowdown_percent),
        gate_failed: exceeded,
        message: if exceeded {
            "slowdown gate exceeded threshold".to_string()
        } else {
            "slowdown gate within threshold".to_string()
        },
        baseline,
        candidate,
    }
}
