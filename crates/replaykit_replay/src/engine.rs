//! Stub and hybrid replay engines.

use crate::config::{HybridReplayPolicy, ReplayConfig};
use crate::error::{ReplayError, ReplayResult};
use crate::guard::NetworkGuard;
use replaykit_artifact::{write_artifact_with, Run, Step, WriteOptions};
use replaykit_canon::{canonical_json, Sha256Digest};
use replaykit_core::{RunId, StepId};
use serde_json::{json, Map, Value};
use std::path::Path;

/// Replay a source run in stub mode: every step re-emits its recorded
/// output without invoking real side effects.
///
/// # Errors
///
/// Returns an error if step hashing fails.
pub fn replay_stub_run(source: &Run, config: &ReplayConfig) -> ReplayResult<Run> {
    let _guard = NetworkGuard::install();
    let steps = source
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| stub_step(index, step, "stub", None))
        .collect::<ReplayResult<Vec<_>>>()?;
    drop(_guard);

    assemble_replay_run(source, config, "stub", steps)
}

/// Replay with selected step outputs substituted from a rerun source,
/// aligned by step index.
///
/// # Errors
///
/// Returns an alignment error under `strict_alignment` when step counts
/// or types disagree at an aligned index.
pub fn replay_hybrid_run(
    source: &Run,
    rerun_source: &Run,
    config: &ReplayConfig,
    policy: &HybridReplayPolicy,
) -> ReplayResult<Run> {
    if policy.strict_alignment && source.steps.len() != rerun_source.steps.len() {
        let index = source.steps.len().min(rerun_source.steps.len());
        return Err(ReplayError::AlignmentMismatch {
            index,
            expected: format!("{} steps", source.steps.len()),
            actual: format!("{} steps", rerun_source.steps.len()),
        });
    }

    let _guard = NetworkGuard::install();
    let mut steps = Vec::with_capacity(source.steps.len());
    for (index, step) in source.steps.iter().enumerate() {
        let rerun_step = rerun_source.steps.get(index);

        if policy.strict_alignment {
            if let Some(rerun) = rerun_step {
                if rerun.step_type != step.step_type {
                    return Err(ReplayError::AlignmentMismatch {
                        index,
                        expected: step.step_type.as_str().to_string(),
                        actual: rerun.step_type.as_str().to_string(),
                    });
                }
            }
        }

        let substitute = policy
            .selects(step.step_type, step.id.as_str())
            .then(|| rerun_step)
            .flatten();
        steps.push(stub_step(index, step, "hybrid", substitute)?);
    }
    drop(_guard);

    assemble_replay_run(source, config, "hybrid", steps)
}

/// Replay in stub mode and persist a deterministic artifact.
///
/// # Errors
///
/// Returns an error if replay or the artifact write fails.
pub fn write_replay_stub_artifact(
    source: &Run,
    out_path: &Path,
    config: &ReplayConfig,
) -> ReplayResult<Value> {
    let replay_run = replay_stub_run(source, config)?;
    write_replay_artifact(source, &replay_run, out_path, config, "stub")
}

/// Replay in hybrid mode and persist a deterministic artifact.
///
/// # Errors
///
/// Returns an error if replay or the artifact write fails.
pub fn write_replay_hybrid_artifact(
    source: &Run,
    rerun_source: &Run,
    out_path: &Path,
    config: &ReplayConfig,
    policy: &HybridReplayPolicy,
) -> ReplayResult<Value> {
    let replay_run = replay_hybrid_run(source, rerun_source, config, policy)?;
    write_replay_artifact(source, &replay_run, out_path, config, "hybrid")
}

fn write_replay_artifact(
    source: &Run,
    replay_run: &Run,
    out_path: &Path,
    config: &ReplayConfig,
    mode: &str,
) -> ReplayResult<Value> {
    let mut metadata = Map::new();
    metadata.insert("replay_mode".to_string(), Value::String(mode.to_string()));
    metadata.insert("replay_of".to_string(), Value::String(source.id.to_string()));
    metadata.insert("seed".to_string(), Value::from(config.seed));
    metadata.insert(
        "fixed_clock".to_string(),
        Value::String(config.fixed_clock.clone()),
    );

    let envelope = write_artifact_with(
        replay_run,
        out_path,
        &WriteOptions {
            metadata,
            ..WriteOptions::default()
        },
    )?;
    tracing::info!(
        mode,
        source_run_id = %source.id,
        replay_run_id = %replay_run.id,
        out = %out_path.display(),
        "replay artifact written"
    );
    Ok(envelope)
}

fn stub_step(
    index: usize,
    source_step: &Step,
    mode: &str,
    substitute: Option<&Step>,
) -> ReplayResult<Step> {
    let mut metadata = source_step.metadata.clone();
    metadata.insert("replay_mode".to_string(), Value::String(mode.to_string()));
    metadata.insert(
        "source_step_id".to_string(),
        Value::String(source_step.id.to_string()),
    );

    let output = match substitute {
        Some(rerun) => {
            metadata.insert(
                "rerun_source_step_id".to_string(),
                Value::String(rerun.id.to_string()),
            );
            metadata.insert("rerun".to_string(), Value::Bool(true));
            rerun.output.clone()
        }
        None => source_step.output.clone(),
    };

    Ok(Step::new(
        StepId::from_counter(index as u64 + 1),
        source_step.step_type,
        source_step.input.clone(),
        output,
        metadata,
    )
    .with_hash()?)
}

fn assemble_replay_run(
    source: &Run,
    config: &ReplayConfig,
    mode: &str,
    steps: Vec<Step>,
) -> ReplayResult<Run> {
    let mut environment = source.environment_fingerprint.clone();
    environment.insert("replay_mode".to_string(), Value::String(mode.to_string()));
    environment.insert("replay_offline".to_string(), Value::Bool(true));
    environment.insert(
        "source_run_id".to_string(),
        Value::String(source.id.to_string()),
    );

    let mut runtime = source.runtime_versions.clone();
    runtime.insert("replay_mode".to_string(), Value::String(mode.to_string()));
    runtime.insert(
        "replay_seed".to_string(),
        Value::String(config.seed.to_string()),
    );
    runtime.insert(
        "replay_fixed_clock".to_string(),
        Value::String(config.fixed_clock.clone()),
    );

    Ok(Run {
        id: deterministic_replay_id(source, config)?,
        timestamp: config.fixed_clock.clone(),
        environment_fingerprint: environment,
        runtime_versions: runtime,
        steps,
    })
}

/// Derive the replay run id from the source identity and the pinned
/// replay inputs, so identical `(source, seed, fixed_clock)` yield the
/// same id.
fn deterministic_replay_id(source: &Run, config: &ReplayConfig) -> ReplayResult<RunId> {
    let hashes: Vec<Value> = source
        .steps
        .iter()
        .map(|step| Value::String(step.hash.clone().unwrap_or_default()))
        .collect();
    let source_fingerprint = canonical_json(&json!({
        "source_id": source.id.to_string(),
        "steps": hashes,
    }))?;
    let payload = canonical_json(&json!({
        "source_fingerprint": source_fingerprint,
        "seed": config.seed,
        "fixed_clock": config.fixed_clock,
    }))?;
    let digest = hex::encode(Sha256Digest::compute(payload.as_bytes()).as_bytes());
    Ok(RunId::new(format!("replay-{}", &digest[..12])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use replaykit_core::StepType;
    use serde_json::json;
    use tempfile::tempdir;

    fn source_run() -> Run {
        let mut run = Run::new(RunId::new("run-src-1"), "2026-02-21T00:00:00Z");
        for (counter, content) in ["alpha", "beta"].iter().enumerate() {
            run.steps.push(
                Step::new(
                    StepId::from_counter(counter as u64 + 1),
                    StepType::ModelResponse,
                    json!({"model": "m1"}),
                    json!({"content": content}),
                    Map::new(),
                )
                .with_hash()
                .unwrap(),
            );
        }
        run
    }

    fn config() -> ReplayConfig {
        ReplayConfig::new(7, "2026-02-22T00:00:00Z").unwrap()
    }

    #[test]
    fn test_stub_replay_preserves_outputs() {
        let source = source_run();
        let replayed = replay_stub_run(&source, &config()).unwrap();

        assert_eq!(replayed.step_count(), 2);
        assert_eq!(replayed.timestamp, "2026-02-22T00:00:00.000Z");
        assert!(replayed.id.as_str().starts_with("replay-"));
        for (index, step) in replayed.steps.iter().enumerate() {
            assert_eq!(step.output, source.steps[index].output);
            assert_eq!(step.metadata["replay_mode"], json!("stub"));
            assert_eq!(
                step.metadata["source_step_id"],
                json!(source.steps[index].id.as_str())
            );
        }
        assert_eq!(replayed.environment_fingerprint["replay_offline"], json!(true));
        assert_eq!(replayed.runtime_versions["replay_seed"], json!("7"));
    }

    #[test]
    fn test_replay_id_deterministic() {
        let source = source_run();
        let first = replay_stub_run(&source, &config()).unwrap();
        let second = replay_stub_run(&source, &config()).unwrap();
        assert_eq!(first.id, second.id);

        let other_seed = ReplayConfig::new(8, "2026-02-22T00:00:00Z").unwrap();
        let third = replay_stub_run(&source, &other_seed).unwrap();
        assert_ne!(first.id, third.id);
    }

    #[test]
    fn test_replay_artifact_byte_identical() {
        let dir = tempdir().unwrap();
        let source = source_run();
        let first = dir.path().join("b.rpk");
        let second = dir.path().join("c.rpk");

        write_replay_stub_artifact(&source, &first, &config()).unwrap();
        write_replay_stub_artifact(&source, &second, &config()).unwrap();

        assert_eq!(
            std::fs::read(&first).unwrap(),
            std::fs::read(&second).unwrap()
        );
    }

    #[test]
    fn test_hybrid_substitutes_selected_outputs() {
        let source = source_run();
        let mut rerun = source.clone();
        rerun.steps[1].output = json!({"content": "rerun beta"});
        rerun.steps[1] = rerun.steps[1].with_hash().unwrap();

        let policy = HybridReplayPolicy {
            rerun_step_ids: std::collections::BTreeSet::from(["step-000002".to_string()]),
            ..HybridReplayPolicy::default()
        };
        let replayed = replay_hybrid_run(&source, &rerun, &config(), &policy).unwrap();

        assert_eq!(replayed.steps[0].output, json!({"content": "alpha"}));
        assert_eq!(replayed.steps[1].output, json!({"content": "rerun beta"}));
        assert_eq!(replayed.steps[1].metadata["rerun"], json!(true));
        assert_eq!(replayed.steps[0].metadata.get("rerun"), None);
    }

    #[test]
    fn test_hybrid_strict_alignment_count_mismatch() {
        let source = source_run();
        let mut rerun = source.clone();
        rerun.steps.pop();

        let policy = HybridReplayPolicy {
            strict_alignment: true,
            ..HybridReplayPolicy::default()
        };
        let err = replay_hybrid_run(&source, &rerun, &config(), &policy).unwrap_err();
        assert_eq!(err.machine_code(), "hybrid_alignment_mismatch");
    }

    #[test]
    fn test_hybrid_strict_alignment_type_mismatch() {
        let source = source_run();
        let mut rerun = source.clone();
        rerun.steps[1] = Step::new(
            StepId::from_counter(2),
            StepType::ToolResponse,
            json!({}),
            json!({}),
            Map::new(),
        )
        .with_hash()
        .unwrap();

        let policy = HybridReplayPolicy {
            strict_alignment: true,
            ..HybridReplayPolicy::default()
        };
        let err = replay_hybrid_run(&source, &rerun, &config(), &policy).unwrap_err();
        match err {
            ReplayError::AlignmentMismatch { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_guard_active_during_replay() {
        // The engine holds the offline guard while rewriting steps; after
        // replay returns, the guard is released.
        let source = source_run();
        let _ = replay_stub_run(&source, &config()).unwrap();
        assert!(!NetworkGuard::is_active());
    }
}
