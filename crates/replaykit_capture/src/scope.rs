//! Capture scope: the stackable unit of run ownership.
//!
//! A scope holds a write-exclusive lock around `(next_id, steps)`;
//! appenders acquire it for the duration of one append only, so concurrent
//! recorders serialize on append while executing their boundaries in
//! parallel. Nested scopes stack per thread; new threads start with no
//! active scope.

use crate::env::{default_environment_fingerprint, default_runtime_versions, utc_now_iso};
use crate::error::CaptureResult;
use crate::policy::InterceptionPolicy;
use replaykit_artifact::{Run, Step};
use replaykit_canon::canonicalize;
use replaykit_core::{RunId, StepId, StepType};
use replaykit_plugins::{CaptureEndEvent, CaptureStartEvent, CaptureStepEvent, LifecycleStatus, PluginManager};
use replaykit_redact::{redact_value, RedactionPolicy};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::sync::{Arc, Mutex, PoisonError};

struct RecorderState {
    next_counter: u64,
    steps: Vec<Step>,
}

/// Mutable recorder for a single run.
pub struct CaptureScope {
    run_id: RunId,
    timestamp: String,
    environment_fingerprint: Map<String, Value>,
    runtime_versions: Map<String, Value>,
    policy: InterceptionPolicy,
    redaction: RedactionPolicy,
    plugins: Option<Arc<PluginManager>>,
    state: Mutex<RecorderState>,
}

impl CaptureScope {
    /// Create a scope with default environment, policies, and the current
    /// time.
    #[must_use]
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            timestamp: utc_now_iso(),
            environment_fingerprint: default_environment_fingerprint(),
            runtime_versions: default_runtime_versions(),
            policy: InterceptionPolicy::default(),
            redaction: RedactionPolicy::standard(),
            plugins: None,
            state: Mutex::new(RecorderState {
                next_counter: 0,
                steps: Vec::new(),
            }),
        }
    }

    /// Pin the run timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Replace the environment fingerprint.
    #[must_use]
    pub fn with_environment_fingerprint(mut self, fingerprint: Map<String, Value>) -> Self {
        self.environment_fingerprint = fingerprint;
        self
    }

    /// Replace the runtime versions mapping.
    #[must_use]
    pub fn with_runtime_versions(mut self, versions: Map<String, Value>) -> Self {
        self.runtime_versions = versions;
        self
    }

    /// Set the interception policy.
    #[must_use]
    pub fn with_policy(mut self, policy: InterceptionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the redaction policy.
    #[must_use]
    pub fn with_redaction(mut self, redaction: RedactionPolicy) -> Self {
        self.redaction = redaction;
        self
    }

    /// Attach a plugin manager for lifecycle notifications.
    #[must_use]
    pub fn with_plugins(mut self, plugins: Arc<PluginManager>) -> Self {
        self.plugins = Some(plugins);
        self
    }

    /// The run id this scope records.
    #[must_use]
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// The pinned run timestamp.
    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// The interception policy in force.
    #[must_use]
    pub fn policy(&self) -> &InterceptionPolicy {
        &self.policy
    }

    /// The redaction policy in force.
    #[must_use]
    pub fn redaction(&self) -> &RedactionPolicy {
        &self.redaction
    }

    /// Number of steps appended so far.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.lock_state().steps.len()
    }

    /// Append one step: assign the next monotonic id, redact all payloads,
    /// compute the hash.
    ///
    /// # Errors
    ///
    /// Returns an error if step hashing fails.
    pub fn record_step(
        &self,
        step_type: StepType,
        input: Value,
        output: Value,
        metadata: Map<String, Value>,
    ) -> CaptureResult<Step> {
        let input = canonicalize(&redact_value(&input, &self.redaction));
        let output = canonicalize(&redact_value(&output, &self.redaction));
        let metadata_value =
            canonicalize(&redact_value(&Value::Object(metadata), &self.redaction));
        let metadata = match metadata_value {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let step = {
            let mut state = self.lock_state();
            state.next_counter += 1;
            let step = Step::new(
                StepId::from_counter(state.next_counter),
                step_type,
                input,
                output,
                metadata,
            )
            .with_hash()?;
            state.steps.push(step.clone());
            step
        };

        if let Some(plugins) = &self.plugins {
            plugins.capture_step(&CaptureStepEvent {
                run_id: self.run_id.to_string(),
                step_id: step.id.to_string(),
                step_type: step.step_type.as_str().to_string(),
                metadata: step.metadata.clone(),
            });
        }
        tracing::trace!(run_id = %self.run_id, step_id = %step.id, step_type = %step.step_type, "step recorded");
        Ok(step)
    }

    /// Snapshot the run recorded so far.
    #[must_use]
    pub fn to_run(&self) -> Run {
        let state = self.lock_state();
        Run {
            id: self.run_id.clone(),
            timestamp: self.timestamp.clone(),
            environment_fingerprint: self.environment_fingerprint.clone(),
            runtime_versions: self.runtime_versions.clone(),
            steps: state.steps.clone(),
        }
    }

    /// Finalize the scope: snapshot the run and notify plugins. The run is
    /// immutable from the caller's point of view afterwards.
    #[must_use]
    pub fn finalize(&self) -> Run {
        let run = self.to_run();
        if let Some(plugins) = &self.plugins {
            plugins.capture_end(&CaptureEndEvent {
                run_id: run.id.to_string(),
                step_count: run.step_count(),
                status: LifecycleStatus::Ok,
                error_type: None,
                error_message: None,
            });
        }
        run
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

thread_local! {
    static SCOPE_STACK: RefCell<Vec<Arc<CaptureScope>>> = const { RefCell::new(Vec::new()) };
}

/// The innermost active scope on this thread, if any.
///
/// Scopes do not propagate to spawned threads; boundaries emitted from a
/// thread with no active scope and no explicit handle are uncaptured.
#[must_use]
pub fn current_scope() -> Option<Arc<CaptureScope>> {
    SCOPE_STACK.with(|stack| stack.borrow().last().cloned())
}

/// Push a scope onto this thread's stack. The inner scope is current for
/// the guard's lifetime; dropping the guard restores the outer scope.
#[must_use]
pub fn enter_scope(scope: Arc<CaptureScope>) -> ScopeGuard {
    if let Some(plugins) = &scope.plugins {
        plugins.capture_start(&CaptureStartEvent {
            run_id: scope.run_id.to_string(),
            timestamp: scope.timestamp.clone(),
        });
    }
    SCOPE_STACK.with(|stack| stack.borrow_mut().push(scope.clone()));
    ScopeGuard { scope }
}

/// Guard restoring the previous scope on drop.
pub struct ScopeGuard {
    scope: Arc<CaptureScope>,
}

impl ScopeGuard {
    /// The scope this guard holds active.
    #[must_use]
    pub fn scope(&self) -> &Arc<CaptureScope> {
        &self.scope
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        SCOPE_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(position) = stack.iter().rposition(|entry| Arc::ptr_eq(entry, &self.scope)) {
                stack.remove(position);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_step_ids_gap_free() {
        let scope = CaptureScope::new(RunId::new("run-scope-1"));
        for _ in 0..3 {
            scope
                .record_step(StepType::PromptRender, json!({}), json!({}), Map::new())
                .unwrap();
        }
        let run = scope.to_run();
        let ids: Vec<&str> = run.steps.iter().map(|step| step.id.as_str()).collect();
        assert_eq!(ids, vec!["step-000001", "step-000002", "step-000003"]);
    }

    #[test]
    fn test_record_step_redacts_before_retention() {
        let scope = CaptureScope::new(RunId::new("run-scope-2"));
        let step = scope
            .record_step(
                StepType::ModelRequest,
                json!({"api_key": "sk-secret1234567890"}),
                json!({}),
                metadata(json!({"authorization": "Bearer sk-secret1234567890"})),
            )
            .unwrap();
        assert_eq!(step.input["api_key"], json!("[REDACTED]"));
        assert_eq!(step.metadata["authorization"], json!("[REDACTED]"));
        assert!(step.hash.is_some());
    }

    #[test]
    fn test_concurrent_appends_serialize() {
        let scope = Arc::new(CaptureScope::new(RunId::new("run-scope-3")));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let scope = scope.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..25 {
                    scope
                        .record_step(StepType::ToolRequest, json!({}), json!({}), Map::new())
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let run = scope.to_run();
        assert_eq!(run.step_count(), 100);
        for (index, step) in run.steps.iter().enumerate() {
            assert_eq!(step.id.counter(), Some(index as u64 + 1));
        }
    }

    #[test]
    fn test_nested_scopes_stack() {
        let outer = Arc::new(CaptureScope::new(RunId::new("run-outer")));
        let inner = Arc::new(CaptureScope::new(RunId::new("run-inner")));

        assert!(current_scope().is_none());
        {
            let _outer_guard = enter_scope(outer.clone());
            assert_eq!(current_scope().unwrap().run_id(), outer.run_id());
            {
                let _inner_guard = enter_scope(inner.clone());
                assert_eq!(current_scope().unwrap().run_id(), inner.run_id());
            }
            assert_eq!(current_scope().unwrap().run_id(), outer.run_id());
        }
        assert!(current_scope().is_none());
    }

    #[test]
    fn test_new_threads_have_no_scope() {
        let scope = Arc::new(CaptureScope::new(RunId::new("run-main")));
        let _guard = enter_scope(scope);
        let seen = std::thread::spawn(|| current_scope().is_some()).join().unwrap();
        assert!(!seen);
    }

    #[test]
    fn test_finalize_snapshot() {
        let scope = CaptureScope::new(RunId::new("run-final")).with_timestamp("2026-02-21T00:00:00Z");
        scope
            .record_step(StepType::OutputFinal, json!({}), json!({"done": true}), Map::new())
            .unwrap();
        let run = scope.finalize();
        assert_eq!(run.id, RunId::new("run-final"));
        assert_eq!(run.timestamp, "2026-02-21T00:00:00Z");
        assert_eq!(run.step_count(), 1);
    }
}
