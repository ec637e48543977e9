//! Lifecycle event payloads delivered to plugins.

use serde::{Deserialize, Serialize};
use serde_json::Map;

/// Terminal status of a lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    /// Phase completed normally
    Ok,
    /// Phase terminated with an error
    Error,
}

/// A capture scope opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureStartEvent {
    /// Run being recorded
    pub run_id: String,
    /// Run timestamp
    pub timestamp: String,
}

/// A step was appended to the active run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureStepEvent {
    /// Run being recorded
    pub run_id: String,
    /// Id of the appended step
    pub step_id: String,
    /// Wire name of the step type
    pub step_type: String,
    /// Redacted step metadata
    pub metadata: Map<String, serde_json::Value>,
}

/// A capture scope finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureEndEvent {
    /// Run that was recorded
    pub run_id: String,
    /// Steps recorded in the scope
    pub step_count: usize,
    /// Terminal status
    pub status: LifecycleStatus,
    /// Error kind when status is `error`
    pub error_type: Option<String>,
    /// Error message when status is `error`
    pub error_message: Option<String>,
}

/// A replay operation started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayStartEvent {
    /// Replay mode (`stub` or `hybrid`)
    pub mode: String,
    /// Run id of the primary source artifact
    pub source_run_id: String,
    /// Run id of the rerun source, in hybrid mode
    pub rerun_from_run_id: Option<String>,
    /// Pinned seed
    pub seed: i64,
    /// Pinned clock
    pub fixed_clock: String,
    /// Steps in the source run
    pub source_step_count: usize,
}

/// A replay operation finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayEndEvent {
    /// Replay mode (`stub` or `hybrid`)
    pub mode: String,
    /// Run id of the primary source artifact
    pub source_run_id: String,
    /// Run id of the rerun source, in hybrid mode
    pub rerun_from_run_id: Option<String>,
    /// Terminal status
    pub status: LifecycleStatus,
    /// Id of the produced replay run on success
    pub replay_run_id: Option<String>,
    /// Steps in the produced run on success
    pub step_count: Option<usize>,
    /// Error kind when status is `error`
    pub error_type: Option<String>,
    /// Error message when status is `error`
    pub error_message: Option<String>,
}

/// A diff operation started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffStartEvent {
    /// Left run id
    pub left_run_id: String,
    /// Right run id
    pub right_run_id: String,
    /// Whether scanning stops at the first divergence
    pub stop_at_first_divergence: bool,
    /// Per-step delta cap
    pub max_changes_per_step: usize,
    /// Steps in the left run
    pub total_left_steps: usize,
    /// Steps in the right run
    pub total_right_steps: usize,
}

/// A diff operation finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEndEvent {
    /// Left run id
    pub left_run_id: String,
    /// Right run id
    pub right_run_id: String,
    /// Terminal status
    pub status: LifecycleStatus,
    /// Whether the runs were identical
    pub identical: Option<bool>,
    /// Index of the first divergence, if any
    pub first_divergence_index: Option<usize>,
    /// Error kind when status is `error`
    pub error_type: Option<String>,
    /// Error message when status is `error`
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_status_serde() {
        assert_eq!(serde_json::to_string(&LifecycleStatus::Ok).unwrap(), "\"ok\"");
        assert_eq!(serde_json::to_string(&LifecycleStatus::Error).unwrap(), "\"error\"");
    }

    #[test]
    fn test_event_serializes() {
        let event = CaptureStartEvent {
            run_id: "run-1".to_string(),
            timestamp: "2026-02-21T00:00:00Z".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["run_id"], "run-1");
    }
}
