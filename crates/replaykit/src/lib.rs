//! ReplayKit - local-first debugging for AI workflows.
//!
//! Captures the externally observable boundaries of an AI program (model,
//! tool, and HTTP calls) into versioned deterministic `.rpk` artifacts,
//! replays them offline byte-identically under fixed inputs, and compares
//! two artifacts in linear time to surface the first semantically
//! meaningful divergence.
//!
//! This crate is the path-oriented facade over the subsystem crates;
//! embedders that need finer control can use those directly.

pub mod api;
pub mod bundle;
pub mod error;

pub use api::{
    assert_run, diff, migrate, record_demo, replay, snapshot_assert, to_canonical_json,
    RecordOutcome, ReplayMode, ReplayOptions, ReplayOutcome,
};
pub use bundle::{bundle, BundleOptions, BundleOutcome};
pub use error::{ReplayKitError, ReplayKitResult};

pub use replaykit_artifact::{
    read_artifact, write_artifact, write_artifact_with, MigrationSummary, Run, SigningRequest,
    Step, WriteOptions,
};
pub use replaykit_canon::{canonical_json, canonicalize, compute_step_hash};
pub use replaykit_capture::{
    build_demo_run, current_scope, enter_scope, CaptureScope, HttpRequest, HttpResponse,
    InterceptionPolicy,
};
pub use replaykit_core::{ArtifactVersion, RunId, StepId, StepType};
pub use replaykit_diff::{AssertOptions, AssertionOutcome, DiffOptions, RunDiffResult, SnapshotOutcome};
pub use replaykit_plugins::{LifecyclePlugin, PluginManager, PLUGIN_API_VERSION};
pub use replaykit_redact::{RedactionConfig, RedactionPolicy};
pub use replaykit_replay::{GuardrailMode, GuardrailReport, HybridReplayPolicy, ReplayConfig};
