//! End-to-end scenarios over the path-oriented surface.

use replaykit::{
    assert_run, diff, migrate, record_demo, replay, AssertOptions, CaptureScope, DiffOptions,
    ReplayMode, ReplayOptions, RunId, StepType,
};
use replaykit_artifact::{envelope_checksum, io::write_envelope, write_artifact};
use replaykit_diff::{DeltaKind, DiffStatus};
use replaykit_replay::{guarded_connect, with_offline_guard, GuardrailMode, ReplayResult};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn replay_options(seed: i64, fixed_clock: &str) -> ReplayOptions {
    ReplayOptions {
        seed,
        fixed_clock: fixed_clock.to_string(),
        ..ReplayOptions::default()
    }
}

/// S1 - determinism: replaying the demo artifact twice with the same seed
/// and clock yields byte-identical files with no divergence.
#[test]
fn scenario_determinism() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.rpk");
    let b = dir.path().join("b.rpk");
    let c = dir.path().join("c.rpk");

    record_demo(&a, None, None).unwrap();
    let first = replay(&a, &b, &replay_options(7, "2026-02-22T00:00:00Z"), None).unwrap();
    let second = replay(&a, &c, &replay_options(7, "2026-02-22T00:00:00Z"), None).unwrap();

    assert_eq!(first.replay_run_id, second.replay_run_id);
    assert_eq!(fs::read(&b).unwrap(), fs::read(&c).unwrap());

    let result = diff(&b, &c, &DiffOptions::default(), None).unwrap();
    assert!(result.first_divergence().is_none());
    assert!(result.identical());
}

fn run_with_final_message(path: &Path, message: &str) {
    let scope = CaptureScope::new(RunId::new("run-s2")).with_timestamp("2026-02-21T00:00:00Z");
    for position in 0..4 {
        scope
            .record_step(
                StepType::ToolResponse,
                json!({"tool": "search"}),
                json!({"result": position}),
                Map::new(),
            )
            .unwrap();
    }
    scope
        .record_step(
            StepType::OutputFinal,
            json!({}),
            json!({"assistant_message": message}),
            Map::new(),
        )
        .unwrap();
    write_artifact(&scope.finalize(), path).unwrap();
}

/// S2 - first divergence: runs identical for steps 0-3, step 4 differs in
/// `output/assistant_message`.
#[test]
fn scenario_first_divergence() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.rpk");
    let b = dir.path().join("b.rpk");
    run_with_final_message(&a, "the answer is 42");
    run_with_final_message(&b, "the answer is 41");

    let result = diff(&a, &b, &DiffOptions::default(), None).unwrap();
    let first = result.first_divergence().unwrap();
    assert_eq!(first.index, 4);
    assert_eq!(first.status, DiffStatus::Changed);

    let delta = first
        .changes
        .iter()
        .find(|change| change.path == "/output/assistant_message")
        .unwrap();
    assert_eq!(delta.kind, DeltaKind::Replaced);

    let outcome = assert_run(&a, &b, &AssertOptions::default()).unwrap();
    assert!(!outcome.passed());
    assert_eq!(outcome.exit_code(), 1);
}

/// S3 - redaction: secret-bearing metadata serializes as `[REDACTED]` and
/// the redacted artifact replays deterministically.
#[test]
fn scenario_redaction() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.rpk");
    let b = dir.path().join("b.rpk");
    let c = dir.path().join("c.rpk");

    let scope = CaptureScope::new(RunId::new("run-s3")).with_timestamp("2026-02-21T00:00:00Z");
    let mut metadata = Map::new();
    metadata.insert(
        "authorization".to_string(),
        Value::String("Bearer sk-ABCdef0123456789".to_string()),
    );
    scope
        .record_step(
            StepType::ModelRequest,
            json!({"model": "m1"}),
            json!({"status": "sent"}),
            metadata,
        )
        .unwrap();
    write_artifact(&scope.finalize(), &a).unwrap();

    let contents = fs::read_to_string(&a).unwrap();
    assert!(!contents.contains("sk-ABCdef0123456789"));
    assert!(contents.contains("[REDACTED]"));

    replay(&a, &b, &replay_options(7, "2026-02-22T00:00:00Z"), None).unwrap();
    replay(&a, &c, &replay_options(7, "2026-02-22T00:00:00Z"), None).unwrap();
    assert_eq!(fs::read(&b).unwrap(), fs::read(&c).unwrap());
}

/// S4 - offline guard: a mis-wired adapter that attempts outbound TCP
/// inside the replay scope aborts the operation and no output artifact is
/// produced.
#[test]
fn scenario_offline_guard() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("never-written.rpk");

    let out_path = out.clone();
    let attempt: ReplayResult<()> = with_offline_guard(|| {
        // The adapter reaches for the network before the engine can write.
        let _stream = guarded_connect("203.0.113.1", 443)?;
        fs::write(&out_path, b"unreachable").unwrap();
        Ok(())
    });

    let err = attempt.unwrap_err();
    assert_eq!(err.machine_code(), "network_attempt_blocked");
    assert!(!out.exists());
}

/// S4 (guardrails) - `fail` mode aborts replay before any output exists.
#[test]
fn scenario_nondeterminism_fail_mode() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.rpk");
    let out = dir.path().join("out.rpk");

    let scope = CaptureScope::new(RunId::new("run-s4")).with_timestamp("2026-02-21T00:00:00Z");
    let mut metadata = Map::new();
    metadata.insert("uses_random".to_string(), Value::Bool(true));
    scope
        .record_step(StepType::ToolResponse, json!({}), json!({}), metadata)
        .unwrap();
    write_artifact(&scope.finalize(), &a).unwrap();

    let err = replay(
        &a,
        &out,
        &ReplayOptions {
            nondeterminism: GuardrailMode::Fail,
            ..replay_options(7, "2026-02-22T00:00:00Z")
        },
        None,
    )
    .unwrap_err();
    assert_eq!(err.machine_code(), "nondeterminism_detected");
    assert!(!out.exists());

    // Warn mode records findings without failing.
    let outcome = replay(
        &a,
        &out,
        &ReplayOptions {
            nondeterminism: GuardrailMode::Warn,
            ..replay_options(7, "2026-02-22T00:00:00Z")
        },
        None,
    )
    .unwrap();
    assert_eq!(outcome.guardrails.count, 1);
    assert!(out.exists());
}

/// Hybrid replay: selected step outputs come from the rerun source,
/// everything else stubs from the primary source.
#[test]
fn scenario_hybrid_replay() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.rpk");
    let b = dir.path().join("b.rpk");
    let out = dir.path().join("hybrid.rpk");
    run_with_final_message(&a, "primary message");
    run_with_final_message(&b, "rerun message");

    let outcome = replay(
        &a,
        &out,
        &ReplayOptions {
            mode: ReplayMode::Hybrid,
            rerun_from: Some(b.clone()),
            rerun_step_types: vec![StepType::OutputFinal],
            strict_alignment: true,
            ..replay_options(7, "2026-02-22T00:00:00Z")
        },
        None,
    )
    .unwrap();
    assert_eq!(outcome.mode, ReplayMode::Hybrid);

    let replayed = replaykit::read_artifact(&out).unwrap();
    assert_eq!(replayed.step_count(), 5);
    let final_step = &replayed.steps[4];
    assert_eq!(final_step.output["assistant_message"], json!("rerun message"));
    assert_eq!(final_step.metadata["rerun"], json!(true));
    // Non-selected steps keep the primary source's outputs.
    assert_eq!(replayed.steps[0].output["result"], json!(0));
    assert_eq!(replayed.steps[0].metadata.get("rerun"), None);
}

fn legacy_envelope() -> Value {
    let mut envelope = json!({
        "version": "0.9",
        "metadata": {
            "run_id": "run-legacy-9",
            "created_at": "2025-06-01T00:00:00Z",
        },
        "payload": {
            "run": {
                "id": "run-legacy-9",
                "timestamp": "2025-06-01T00:00:00Z",
                "env_fingerprint": {"os": "linux"},
                "runtime": {"replaykit": "0.0.9"},
                "steps": [
                    {
                        "id": "step-000001",
                        "type": "model.request",
                        "request": {"prompt": "hi"},
                        "response": {"status": "sent"},
                        "metadata": {"model": "m1"},
                        "step_hash": "sha256:1111111111111111111111111111111111111111111111111111111111111111",
                    },
                    {
                        "id": "step-000002",
                        "type": "output.final",
                        "request": {},
                        "response": {"assistant_message": "hello"},
                        "metadata": {},
                    },
                ],
            },
        },
    });
    let checksum = envelope_checksum(&envelope).unwrap();
    envelope["checksum"] = Value::String(checksum);
    envelope
}

/// S5 - migration: a 0.9 fixture migrates to a valid 1.0 artifact and
/// every step hash is accounted for.
#[test]
fn scenario_migration() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("legacy-0.9.rpk");
    let out = dir.path().join("migrated.rpk");
    write_envelope(&legacy_envelope(), &source).unwrap();

    let summary = migrate(&source, &out).unwrap();
    assert_eq!(summary.source_version, "0.9");
    assert_eq!(summary.target_version, "1.0");
    assert_eq!(
        summary.preserved_step_hashes + summary.recomputed_step_hashes,
        summary.total_steps
    );

    // The migrated artifact passes full verification and its hashes check
    // out against canonical content.
    let run = replaykit::read_artifact(&out).unwrap();
    assert_eq!(run.step_count(), 2);
    for step in &run.steps {
        assert_eq!(step.hash.as_deref(), Some(step.computed_hash().unwrap().as_str()));
    }
}

/// S6 - checksum tamper: one flipped payload byte fails the read, and
/// diff/assert refuse to run against the artifact.
#[test]
fn scenario_checksum_tamper() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.rpk");
    let b = dir.path().join("b.rpk");
    record_demo(&a, None, None).unwrap();
    record_demo(&b, None, None).unwrap();

    let contents = fs::read_to_string(&a).unwrap();
    let tampered = contents.replace("debugging", "debuggingX");
    assert_ne!(contents, tampered);
    fs::write(&a, tampered).unwrap();

    let err = replaykit::read_artifact(&a).unwrap_err();
    assert_eq!(err.machine_code(), "checksum_mismatch");

    let err = diff(&a, &b, &DiffOptions::default(), None).unwrap_err();
    assert_eq!(err.machine_code(), "checksum_mismatch");
    assert_eq!(err.exit_code(), 1);

    let err = assert_run(&a, &b, &AssertOptions::default()).unwrap_err();
    assert_eq!(err.machine_code(), "checksum_mismatch");
}
