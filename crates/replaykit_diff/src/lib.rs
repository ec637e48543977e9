//! Linear diff engine and assertion semantics for ReplayKit.
//!
//! Diff compares two runs by step index in O(n) time, emitting per-index
//! status and field-level deltas; divergence is a value, not an error.
//! Assertion layers pass/fail semantics, drift gates, and the slowdown
//! gate on top; the snapshot store keeps one named baseline per `.rpk`.

pub mod assertion;
pub mod engine;
pub mod error;
pub mod models;
pub mod performance;
pub mod snapshot;

pub use assertion::{assert_runs, AssertOptions, AssertionOutcome, AssertionStatus};
pub use engine::{diff_runs, DiffOptions};
pub use error::{DiffError, DiffResult};
pub use models::{DeltaKind, DiffStatus, DiffSummary, RunDiffResult, StepDiffEntry, ValueDelta};
pub use performance::{
    evaluate_slowdown_gate, extract_step_duration_ms, summarize_run_timing, SlowdownGateResult,
    SlowdownGateStatus, TimingSummary,
};
pub use snapshot::{
    assert_snapshot, resolve_snapshot_baseline_path, update_snapshot, SnapshotAction,
    SnapshotOutcome, SnapshotStatus,
};
