//! Path-oriented operations: record, replay, diff, assert, snapshot,
//! migrate.

use crate::error::{ReplayKitError, ReplayKitResult};
use replaykit_artifact::{migrate_file, read_artifact, write_artifact, MigrationSummary};
use replaykit_canon::canonical_json;
use replaykit_capture::{build_demo_run_with, InterceptionPolicy};
use replaykit_core::StepType;
use replaykit_diff::{
    assert_runs, assert_snapshot, diff_runs, update_snapshot, AssertOptions, AssertionOutcome,
    DiffOptions, RunDiffResult, SnapshotOutcome,
};
use replaykit_plugins::{
    DiffEndEvent, DiffStartEvent, LifecycleStatus, PluginManager, ReplayEndEvent, ReplayStartEvent,
};
use replaykit_redact::{RedactionConfig, RedactionPolicy};
use replaykit_replay::{
    detect_run_nondeterminism, guardrail_report, write_replay_hybrid_artifact,
    write_replay_stub_artifact, GuardrailMode, GuardrailReport, HybridReplayPolicy, ReplayConfig,
    ReplayError,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Outcome of a demo record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    /// Where the artifact was written
    pub path: PathBuf,
    /// Recorded run id
    pub run_id: String,
    /// Steps in the recorded run
    pub step_count: usize,
}

/// Record the built-in demo run to an artifact.
///
/// # Errors
///
/// Returns an error if policy construction, capture, or the write fails.
pub fn record_demo(
    path: &Path,
    redaction: Option<&RedactionConfig>,
    intercept: Option<InterceptionPolicy>,
) -> ReplayKitResult<RecordOutcome> {
    let redaction_policy = match redaction {
        Some(config) => RedactionPolicy::from_config(config)?,
        None => RedactionPolicy::standard(),
    };
    let policy = intercept.unwrap_or_else(|| InterceptionPolicy {
        capture_http_bodies: false,
        ..InterceptionPolicy::default()
    });

    let run = build_demo_run_with(policy, redaction_policy)?;
    write_artifact(&run, path)?;
    tracing::info!(run_id = %run.id, path = %path.display(), "demo run recorded");
    Ok(RecordOutcome {
        path: path.to_path_buf(),
        run_id: run.id.to_string(),
        step_count: run.step_count(),
    })
}

/// Replay mode selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayMode {
    /// Re-emit recorded outputs
    Stub,
    /// Substitute selected outputs from a rerun source
    Hybrid,
}

impl ReplayMode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Stub => "stub",
            Self::Hybrid => "hybrid",
        }
    }
}

/// Options for the replay operation.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Replay mode
    pub mode: ReplayMode,
    /// Pinned RNG seed
    pub seed: i64,
    /// Pinned clock (ISO-8601 with offset)
    pub fixed_clock: String,
    /// Rerun source artifact for hybrid mode
    pub rerun_from: Option<PathBuf>,
    /// Step types substituted from the rerun source
    pub rerun_step_types: Vec<StepType>,
    /// Step ids substituted from the rerun source
    pub rerun_step_ids: Vec<String>,
    /// Fail on count/type misalignment in hybrid mode
    pub strict_alignment: bool,
    /// Determinism guardrail mode
    pub nondeterminism: GuardrailMode,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            mode: ReplayMode::Stub,
            seed: 0,
            fixed_clock: "2026-01-01T00:00:00Z".to_string(),
            rerun_from: None,
            rerun_step_types: Vec::new(),
            rerun_step_ids: Vec::new(),
            strict_alignment: false,
            nondeterminism: GuardrailMode::Off,
        }
    }
}

/// Outcome of a replay operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayOutcome {
    /// Where the replay artifact was written
    pub out_path: PathBuf,
    /// Id of the produced replay run
    pub replay_run_id: String,
    /// Id of the source run
    pub source_run_id: String,
    /// Mode that ran
    pub mode: ReplayMode,
    /// Guardrail report for the source artifact
    pub guardrails: GuardrailReport,
}

/// Replay a source artifact into a new deterministic artifact.
///
/// Byte-identical output under identical `(source, seed, fixed_clock)`;
/// aborts without writing when guardrails fail or a network attempt is
/// made.
///
/// # Errors
///
/// Returns an error on verification failure, guardrail failure in `fail`
/// mode, hybrid misalignment, or I/O failure.
pub fn replay(
    source: &Path,
    out: &Path,
    options: &ReplayOptions,
    plugins: Option<&PluginManager>,
) -> ReplayKitResult<ReplayOutcome> {
    let source_run = read_artifact(source).map_err(ReplayKitError::from)?;
    let config = ReplayConfig::new(options.seed, &options.fixed_clock).map_err(ReplayKitError::from)?;

    let rerun_run = match (options.mode, &options.rerun_from) {
        (ReplayMode::Hybrid, Some(rerun_path)) => Some(read_artifact(rerun_path)?),
        (ReplayMode::Hybrid, None) => {
            return Err(ReplayKitError::UsageError {
                message: "hybrid replay requires rerun_from".to_string(),
            });
        }
        (ReplayMode::Stub, _) => None,
    };

    if let Some(manager) = plugins {
        manager.replay_start(&ReplayStartEvent {
            mode: options.mode.as_str().to_string(),
            source_run_id: source_run.id.to_string(),
            rerun_from_run_id: rerun_run.as_ref().map(|run| run.id.to_string()),
            seed: config.seed,
            fixed_clock: config.fixed_clock.clone(),
            source_step_count: source_run.step_count(),
        });
    }

    let findings = if options.nondeterminism == GuardrailMode::Off {
        Vec::new()
    } else {
        detect_run_nondeterminism(&source_run, "source")
    };
    let guardrails = guardrail_report(options.nondeterminism, findings);
    if options.nondeterminism == GuardrailMode::Fail && guardrails.count > 0 {
        let error = ReplayError::NondeterminismDetected {
            count: guardrails.count,
        };
        notify_replay_end(plugins, options.mode, &source_run.id.to_string(), &error);
        return Err(error.into());
    }

    let result = match (options.mode, &rerun_run) {
        (ReplayMode::Stub, _) => write_replay_stub_artifact(&source_run, out, &config),
        (ReplayMode::Hybrid, Some(rerun)) => {
            let policy = HybridReplayPolicy {
                rerun_step_types: options.rerun_step_types.iter().copied().collect(),
                rerun_step_ids: options.rerun_step_ids.iter().cloned().collect::<BTreeSet<_>>(),
                strict_alignment: options.strict_alignment,
            };
            write_replay_hybrid_artifact(&source_run, rerun, out, &config, &policy)
        }
        (ReplayMode::Hybrid, None) => unreachable!("hybrid replay requires rerun_from"),
    };

    match result {
        Ok(envelope) => {
            let replay_run_id = envelope
                .pointer("/payload/run/id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if let Some(manager) = plugins {
                manager.replay_end(&ReplayEndEvent {
                    mode: options.mode.as_str().to_string(),
                    source_run_id: source_run.id.to_string(),
                    rerun_from_run_id: rerun_run.as_ref().map(|run| run.id.to_string()),
                    status: LifecycleStatus::Ok,
                    replay_run_id: Some(replay_run_id.clone()),
                    step_count: Some(source_run.step_count()),
                    error_type: None,
                    error_message: None,
                });
            }
            Ok(ReplayOutcome {
                out_path: out.to_path_buf(),
                replay_run_id,
                source_run_id: source_run.id.to_string(),
                mode: options.mode,
                guardrails,
            })
        }
        Err(error) => {
            notify_replay_end(plugins, options.mode, &source_run.id.to_string(), &error);
            Err(error.into())
        }
    }
}

fn notify_replay_end(
    plugins: Option<&PluginManager>,
    mode: ReplayMode,
    source_run_id: &str,
    error: &ReplayError,
) {
    let Some(manager) = plugins else { return };
    manager.replay_end(&ReplayEndEvent {
        mode: mode.as_str().to_string(),
        source_run_id: source_run_id.to_string(),
        rerun_from_run_id: None,
        status: LifecycleStatus::Error,
        replay_run_id: None,
        step_count: None,
        error_type: Some(error.machine_code().to_string()),
        error_message: Some(error.to_string()),
    });
}

/// Diff two artifacts by step index.
///
/// # Errors
///
/// Returns an error only for input problems; divergence is a value in the
/// result.
pub fn diff(
    left: &Path,
    right: &Path,
    options: &DiffOptions,
    plugins: Option<&PluginManager>,
) -> ReplayKitResult<RunDiffResult> {
    let left_run = read_artifact(left)?;
    let right_run = read_artifact(right)?;

    if let Some(manager) = plugins {
        manager.diff_start(&DiffStartEvent {
            left_run_id: left_run.id.to_string(),
            right_run_id: right_run.id.to_string(),
            stop_at_first_divergence: options.first_only,
            max_changes_per_step: options.max_changes_per_step,
            total_left_steps: left_run.step_count(),
            total_right_steps: right_run.step_count(),
        });
    }

    let result = diff_runs(&left_run, &right_run, options);

    if let Some(manager) = plugins {
        manager.diff_end(&DiffEndEvent {
            left_run_id: left_run.id.to_string(),
            right_run_id: right_run.id.to_string(),
            status: LifecycleStatus::Ok,
            identical: Some(result.identical()),
            first_divergence_index: result.first_divergence().map(|entry| entry.index),
            error_type: None,
            error_message: None,
        });
    }
    tracing::debug!(
        left = %result.left_run_id,
        right = %result.right_run_id,
        identical = result.identical(),
        "diff completed"
    );
    Ok(result)
}

/// Assert a candidate artifact against a baseline artifact.
///
/// # Errors
///
/// Returns an error for input problems; assertion failure is reported in
/// the outcome, not as an `Err`.
pub fn assert_run(
    baseline: &Path,
    candidate: &Path,
    options: &AssertOptions,
) -> ReplayKitResult<AssertionOutcome> {
    let baseline_run = read_artifact(baseline)?;
    let candidate_run = read_artifact(candidate)?;
    Ok(assert_runs(&baseline_run, &candidate_run, options))
}

/// Store-backed assertion against a named snapshot baseline.
///
/// # Errors
///
/// Returns an error for bad snapshot names or artifact I/O failures.
pub fn snapshot_assert(
    name: &str,
    candidate: &Path,
    snapshots_dir: &Path,
    update: bool,
    options: &AssertOptions,
) -> ReplayKitResult<SnapshotOutcome> {
    let outcome = if update {
        update_snapshot(name, candidate, snapshots_dir)?
    } else {
        assert_snapshot(name, candidate, snapshots_dir, options)?
    };
    Ok(outcome)
}

/// Migrate an artifact to the current schema version.
///
/// # Errors
///
/// Returns `unsupported_version`, `malformed_payload`, or
/// `checksum_invalid` per the migration contract.
pub fn migrate(source: &Path, out: &Path) -> ReplayKitResult<MigrationSummary> {
    Ok(migrate_file(source, out)?)
}

/// Render any serializable result payload as canonical JSON (sorted keys,
/// `\n` line endings) for stable downstream diffing.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_canonical_json<T: Serialize>(value: &T) -> ReplayKitResult<String> {
    let raw = serde_json::to_value(value).map_err(|err| ReplayKitError::UsageError {
        message: format!("result payload is not serializable: {err}"),
    })?;
    Ok(canonical_json(&raw)?)
}
