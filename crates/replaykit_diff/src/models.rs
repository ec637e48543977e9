//! Structured diff results: per-index entries, field deltas, summary.

use replaykit_core::{RunId, StepId, StepType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Classification of one compared step index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    /// Both present, same type and hash
    Identical,
    /// Both present, type or hash differ
    Changed,
    /// Only the right run has a step at this index
    MissingLeft,
    /// Only the left run has a step at this index
    MissingRight,
}

/// Kind of a field-level delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaKind {
    /// Present only on the right side
    Added,
    /// Present only on the left side
    Removed,
    /// Present on both sides with different values
    Replaced,
}

/// A single value delta at a JSON-pointer path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueDelta {
    /// JSON-pointer path rooted at `/input`, `/output`, or `/metadata`
    pub path: String,
    /// Delta kind derived from side presence
    pub kind: DeltaKind,
    /// Left-side value, absent for `added`
    pub left: Option<Value>,
    /// Right-side value, absent for `removed`
    pub right: Option<Value>,
}

impl ValueDelta {
    /// Build a delta, deriving the kind from side presence.
    #[must_use]
    pub fn new(path: String, left: Option<Value>, right: Option<Value>) -> Self {
        let kind = match (&left, &right) {
            (None, _) => DeltaKind::Added,
            (_, None) => DeltaKind::Removed,
            _ => DeltaKind::Replaced,
        };
        Self {
            path,
            kind,
            left,
            right,
        }
    }
}

/// Diff details for one step index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDiffEntry {
    /// 0-based step index
    pub index: usize,
    /// Classification of this index
    pub status: DiffStatus,
    /// Left step id, when present
    pub left_step_id: Option<StepId>,
    /// Right step id, when present
    pub right_step_id: Option<StepId>,
    /// Left step type, when present
    pub left_type: Option<StepType>,
    /// Right step type, when present
    pub right_type: Option<StepType>,
    /// High-signal context fields (model, tool, url, ...)
    #[serde(default)]
    pub context: Map<String, Value>,
    /// Field-level deltas in canonical traversal order
    #[serde(default)]
    pub changes: Vec<ValueDelta>,
    /// Whether deltas were cut off at the per-step cap
    #[serde(default)]
    pub truncated_changes: bool,
}

/// Per-status entry counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    /// Indices classified identical
    pub identical: usize,
    /// Indices classified changed
    pub changed: usize,
    /// Indices present only on the right
    pub missing_left: usize,
    /// Indices present only on the left
    pub missing_right: usize,
}

/// Structured diff of two runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDiffResult {
    /// Left run id
    pub left_run_id: RunId,
    /// Right run id
    pub right_run_id: RunId,
    /// Steps in the left run
    pub total_left_steps: usize,
    /// Steps in the right run
    pub total_right_steps: usize,
    /// Per-index entries in index order
    pub entries: Vec<StepDiffEntry>,
}

impl RunDiffResult {
    /// Whether every compared index is identical.
    #[must_use]
    pub fn identical(&self) -> bool {
        self.entries.iter().all(|entry| entry.status == DiffStatus::Identical)
    }

    /// The first non-identical entry, the root-cause pointer.
    #[must_use]
    pub fn first_divergence(&self) -> Option<&StepDiffEntry> {
        self.entries.iter().find(|entry| entry.status != DiffStatus::Identical)
    }

    /// Per-status counts.
    #[must_use]
    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for entry in &self.entries {
            match entry.status {
                DiffStatus::Identical => summary.identical += 1,
                DiffStatus::Changed => summary.changed += 1,
                DiffStatus::MissingLeft => summary.missing_left += 1,
                DiffStatus::MissingRight => summary.missing_right += 1,
            }
        }
        summary
    }
}
