//! Plugin lifecycle wiring across capture, replay, and diff.

use replaykit::{
    diff, record_demo, replay, CaptureScope, DiffOptions, LifecyclePlugin, PluginManager,
    ReplayOptions, RunId, StepType,
};
use replaykit_plugins::{
    CaptureStartEvent, CaptureStepEvent, DiffEndEvent, DiffStartEvent, ReplayEndEvent,
    ReplayStartEvent,
};
use serde_json::{json, Map};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

#[derive(Default)]
struct EventLog {
    entries: Mutex<Vec<String>>,
}

impl EventLog {
    fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    fn snapshot(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

struct RecordingPlugin {
    log: Arc<EventLog>,
}

impl LifecyclePlugin for RecordingPlugin {
    fn name(&self) -> &str {
        "recording"
    }

    fn on_capture_start(&self, event: &CaptureStartEvent) {
        self.log.push(format!("capture_start:{}", event.run_id));
    }

    fn on_capture_step(&self, event: &CaptureStepEvent) {
        self.log.push(format!("capture_step:{}", event.step_id));
    }

    fn on_replay_start(&self, event: &ReplayStartEvent) {
        self.log.push(format!("replay_start:{}", event.mode));
    }

    fn on_replay_end(&self, event: &ReplayEndEvent) {
        self.log.push(format!(
            "replay_end:{}",
            event.replay_run_id.clone().unwrap_or_default()
        ));
    }

    fn on_diff_start(&self, event: &DiffStartEvent) {
        self.log.push(format!("diff_start:{}", event.left_run_id));
    }

    fn on_diff_end(&self, event: &DiffEndEvent) {
        self.log.push(format!("diff_end:identical={:?}", event.identical));
    }
}

struct ExplodingPlugin;

impl LifecyclePlugin for ExplodingPlugin {
    fn name(&self) -> &str {
        "exploding"
    }

    fn on_capture_step(&self, _event: &CaptureStepEvent) {
        panic!("plugin failure must not abort capture");
    }
}

fn manager_with(log: Arc<EventLog>) -> Arc<PluginManager> {
    let mut manager = PluginManager::new();
    manager.register(Box::new(RecordingPlugin { log })).unwrap();
    manager.register(Box::new(ExplodingPlugin)).unwrap();
    Arc::new(manager)
}

#[test]
fn test_capture_lifecycle_events_and_isolation() {
    let log = Arc::new(EventLog::default());
    let manager = manager_with(log.clone());

    let scope = Arc::new(
        CaptureScope::new(RunId::new("run-plugin-1"))
            .with_timestamp("2026-02-21T00:00:00Z")
            .with_plugins(manager.clone()),
    );
    let guard = replaykit::enter_scope(scope.clone());
    scope
        .record_step(StepType::PromptRender, json!({}), json!({}), Map::new())
        .unwrap();
    let run = scope.finalize();
    drop(guard);

    // The exploding plugin never aborted the capture.
    assert_eq!(run.step_count(), 1);
    let events = log.snapshot();
    assert!(events.contains(&"capture_start:run-plugin-1".to_string()));
    assert!(events.contains(&"capture_step:step-000001".to_string()));

    let diagnostics = manager.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].plugin, "exploding");
    assert_eq!(diagnostics[0].hook, "capture_step");
}

#[test]
fn test_replay_and_diff_lifecycle_events() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.rpk");
    let b = dir.path().join("b.rpk");
    record_demo(&a, None, None).unwrap();

    let log = Arc::new(EventLog::default());
    let manager = manager_with(log.clone());

    let outcome = replay(
        &a,
        &b,
        &ReplayOptions {
            seed: 7,
            fixed_clock: "2026-02-22T00:00:00Z".to_string(),
            ..ReplayOptions::default()
        },
        Some(&manager),
    )
    .unwrap();

    let result = diff(&a, &b, &DiffOptions::default(), Some(&manager)).unwrap();
    assert!(!result.identical()); // replay re-stamps metadata

    let events = log.snapshot();
    assert!(events.contains(&"replay_start:stub".to_string()));
    assert!(events.contains(&format!("replay_end:{}", outcome.replay_run_id)));
    assert!(events.contains(&"diff_start:run-demo-001".to_string()));
    assert!(events.iter().any(|entry| entry.starts_with("diff_end:")));
}
