//! O(n) run diff with first-divergence detection.
//!
//! Steps are compared by ordered position. Diff output is a pure function
//! of the two inputs; delta ordering follows canonical traversal order.

use crate::models::{DiffStatus, RunDiffResult, StepDiffEntry, ValueDelta};
use replaykit_artifact::{Run, Step};
use replaykit_canon::{canonicalize_with, CanonOptions};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// High-signal fields extracted for human-readable output.
const CONTEXT_KEYS: &[&str] = &[
    "model",
    "provider",
    "tool",
    "method",
    "url",
    "temperature",
    "max_tokens",
];

/// Options for one diff pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
    /// Stop scanning after the first divergence (its entry is still emitted)
    pub first_only: bool,
    /// Per-step delta cap; overflow sets `truncated_changes`
    pub max_changes_per_step: usize,
    /// Include volatile (denylisted) metadata keys in deltas
    pub strict: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            first_only: false,
            max_changes_per_step: 32,
            strict: false,
        }
    }
}

/// Diff two runs by step index.
#[must_use]
pub fn diff_runs(left: &Run, right: &Run, options: &DiffOptions) -> RunDiffResult {
    let max_len = left.steps.len().max(right.steps.len());
    let mut entries = Vec::with_capacity(max_len);

    for index in 0..max_len {
        let entry = diff_step(
            index,
            left.steps.get(index),
            right.steps.get(index),
            options,
        );
        let diverged = entry.status != DiffStatus::Identical;
        entries.push(entry);
        if options.first_only && diverged {
            break;
        }
    }

    RunDiffResult {
        left_run_id: left.id.clone(),
        right_run_id: right.id.clone(),
        total_left_steps: left.steps.len(),
        total_right_steps: right.steps.len(),
        entries,
    }
}

fn diff_step(
    index: usize,
    left: Option<&Step>,
    right: Option<&Step>,
    options: &DiffOptions,
) -> StepDiffEntry {
    match (left, right) {
        (None, Some(right_step)) => StepDiffEntry {
            index,
            status: DiffStatus::MissingLeft,
            left_step_id: None,
            right_step_id: Some(right_step.id.clone()),
            left_type: None,
            right_type: Some(right_step.step_type),
            context: Map::new(),
            changes: vec![ValueDelta::new(
                "/step".to_string(),
                None,
                Some(step_value(right_step)),
            )],
            truncated_changes: false,
        },
        (Some(left_step), None) => StepDiffEntry {
            index,
            status: DiffStatus::MissingRight,
            left_step_id: Some(left_step.id.clone()),
            right_step_id: None,
            left_type: Some(left_step.step_type),
            right_type: None,
            context: Map::new(),
            changes: vec![ValueDelta::new(
                "/step".to_string(),
                Some(step_value(left_step)),
                None,
            )],
            truncated_changes: false,
        },
        (Some(left_step), Some(right_step)) => {
            if steps_equivalent(left_step, right_step) {
                return StepDiffEntry {
                    index,
                    status: DiffStatus::Identical,
                    left_step_id: Some(left_step.id.clone()),
                    right_step_id: Some(right_step.id.clone()),
                    left_type: Some(left_step.step_type),
                    right_type: Some(right_step.step_type),
                    context: extract_context(left_step, right_step),
                    changes: Vec::new(),
                    truncated_changes: false,
                };
            }

            let max_changes = options.max_changes_per_step.max(1);
            let mut changes = Vec::new();
            let mut truncated = false;

            if left_step.step_type != right_step.step_type {
                changes.push(ValueDelta::new(
                    "/type".to_string(),
                    Some(Value::String(left_step.step_type.as_str().to_string())),
                    Some(Value::String(right_step.step_type.as_str().to_string())),
                ));
            }
            if step_hash(left_step) != step_hash(right_step) {
                changes.push(ValueDelta::new(
                    "/hash".to_string(),
                    Some(Value::String(step_hash(left_step).to_string())),
                    Some(Value::String(step_hash(right_step).to_string())),
                ));
            }

            truncated |= collect_value_changes(
                Some(&left_step.input),
                Some(&right_step.input),
                "/input",
                &mut changes,
                max_changes,
            );
            truncated |= collect_value_changes(
                Some(&left_step.output),
                Some(&right_step.output),
                "/output",
                &mut changes,
                max_changes,
            );

            let left_metadata = metadata_for_diff(&left_step.metadata, options.strict);
            let right_metadata = metadata_for_diff(&right_step.metadata, options.strict);
            truncated |= collect_value_changes(
                Some(&left_metadata),
                Some(&right_metadata),
                "/metadata",
                &mut changes,
                max_changes,
            );

            StepDiffEntry {
                index,
                status: DiffStatus::Changed,
                left_step_id: Some(left_step.id.clone()),
                right_step_id: Some(right_step.id.clone()),
                left_type: Some(left_step.step_type),
                right_type: Some(right_step.step_type),
                context: extract_context(left_step, right_step),
                changes,
                truncated_changes: truncated,
            }
        }
        (None, None) => StepDiffEntry {
            index,
            status: DiffStatus::Identical,
            left_step_id: None,
            right_step_id: None,
            left_type: None,
            right_type: None,
            context: Map::new(),
            changes: Vec::new(),
            truncated_changes: false,
        },
    }
}

fn steps_equivalent(left: &Step, right: &Step) -> bool {
    left.step_type == right.step_type && step_hash(left) == step_hash(right)
}

fn step_hash(step: &Step) -> &str {
    step.hash.as_deref().unwrap_or("")
}

fn step_value(step: &Step) -> Value {
    serde_json::to_value(step).unwrap_or(Value::Null)
}

/// Volatile metadata keys are non-semantic; they are stripped from the
/// compared view unless strict diffing is requested.
fn metadata_for_diff(metadata: &Map<String, Value>, strict: bool) -> Value {
    let raw = Value::Object(metadata.clone());
    canonicalize_with(&raw, &CanonOptions { strip_volatile: !strict })
}

fn extract_context(left: &Step, right: &Step) -> Map<String, Value> {
    let mut context = Map::new();
    for key in CONTEXT_KEYS {
        let left_value = extract_value(left, key);
        let right_value = extract_value(right, key);
        match (left_value, right_value) {
            (None, None) => {}
            (l, r) if l == r => {
                if let Some(value) = l {
                    context.insert((*key).to_string(), value);
                }
            }
            (l, r) => {
                let mut sides = Map::new();
                sides.insert("left".to_string(), l.unwrap_or(Value::Null));
                sides.insert("right".to_string(), r.unwrap_or(Value::Null));
                context.insert((*key).to_string(), Value::Object(sides));
            }
        }
    }
    context
}

fn extract_value(step: &Step, key: &str) -> Option<Value> {
    if let Some(value) = step.metadata.get(key) {
        return Some(value.clone());
    }
    if let Some(value) = step.input.as_object().and_then(|map| map.get(key)) {
        return Some(value.clone());
    }
    if let Some(value) = step.output.as_object().and_then(|map| map.get(key)) {
        return Some(value.clone());
    }
    None
}

fn collect_value_changes(
    left: Option<&Value>,
    right: Option<&Value>,
    path: &str,
    out: &mut Vec<ValueDelta>,
    max_changes: usize,
) -> bool {
    if out.len() >= max_changes {
        return true;
    }

    match (left, right) {
        (None, None) => false,
        (Some(Value::Object(left_map)), Some(Value::Object(right_map))) => {
            let mut truncated = false;
            let keys: BTreeSet<&String> = left_map.keys().chain(right_map.keys()).collect();
            for key in keys {
                let child_path = format!("{path}/{}", escape_json_pointer(key));
                truncated |= collect_value_changes(
                    left_map.get(key.as_str()),
                    right_map.get(key.as_str()),
                    &child_path,
                    out,
                    max_changes,
                );
                if out.len() >= max_changes {
                    return true;
                }
            }
            truncated
        }
        (Some(Value::Array(left_items)), Some(Value::Array(right_items))) => {
            let mut truncated = false;
            let max_len = left_items.len().max(right_items.len());
            for index in 0..max_len {
                let child_path = format!("{path}/{index}");
                truncated |= collect_value_changes(
                    left_items.get(index),
                    right_items.get(index),
                    &child_path,
                    out,
                    max_changes,
                );
                if out.len() >= max_changes {
                    return true;
                }
            }
            truncated
        }
        (Some(left_value), Some(right_value)) => {
            if left_value != right_value {
                out.push(ValueDelta::new(
                    path.to_string(),
                    Some(left_value.clone()),
                    Some(right_value.clone()),
                ));
            }
            out.len() >= max_changes
        }
        (left_value, right_value) => {
            out.push(ValueDelta::new(
                path.to_string(),
                left_value.cloned(),
                right_value.cloned(),
            ));
            out.len() >= max_changes
        }
    }
}

fn escape_json_pointer(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeltaKind;
    use replaykit_core::{RunId, StepId, StepType};
    use serde_json::json;

    fn step(counter: u64, step_type: StepType, output: Value) -> Step {
        let mut metadata = Map::new();
        metadata.insert("model".to_string(), json!("m1"));
        Step::new(
            StepId::from_counter(counter),
            step_type,
            json!({"prompt": "p"}),
            output,
            metadata,
        )
        .with_hash()
        .unwrap()
    }

    fn run(id: &str, steps: Vec<Step>) -> Run {
        let mut run = Run::new(RunId::new(id), "2026-02-21T00:00:00Z");
        run.steps = steps;
        run
    }

    #[test]
    fn test_self_diff_is_identical() {
        let base = run(
            "run-a",
            vec![
                step(1, StepType::ModelRequest, json!({"status": "sent"})),
                step(2, StepType::ModelResponse, json!({"content": "hi"})),
            ],
        );
        let result = diff_runs(&base, &base, &DiffOptions::default());
        assert!(result.identical());
        assert!(result.first_divergence().is_none());
        assert_eq!(result.summary().identical, 2);
    }

    #[test]
    fn test_first_divergence_index() {
        let shared: Vec<Step> = (1..=4)
            .map(|counter| step(counter, StepType::ToolResponse, json!({"result": counter})))
            .collect();

        let mut left_steps = shared.clone();
        left_steps.push(step(5, StepType::OutputFinal, json!({"assistant_message": "good"})));
        let mut right_steps = shared;
        right_steps.push(step(5, StepType::OutputFinal, json!({"assistant_message": "bad"})));

        let result = diff_runs(
            &run("run-a", left_steps),
            &run("run-b", right_steps),
            &DiffOptions::default(),
        );
        let first = result.first_divergence().unwrap();
        assert_eq!(first.index, 4);
        assert_eq!(first.status, DiffStatus::Changed);
        let delta = first
            .changes
            .iter()
            .find(|change| change.path == "/output/assistant_message")
            .unwrap();
        assert_eq!(delta.kind, DeltaKind::Replaced);
        assert_eq!(delta.left, Some(json!("good")));
        assert_eq!(delta.right, Some(json!("bad")));
    }

    #[test]
    fn test_missing_steps_classified_by_side() {
        let left = run(
            "run-a",
            vec![step(1, StepType::PromptRender, json!({"prompt": "x"}))],
        );
        let right = run(
            "run-b",
            vec![
                step(1, StepType::PromptRender, json!({"prompt": "x"})),
                step(2, StepType::OutputFinal, json!({"assistant_message": "x"})),
            ],
        );

        let result = diff_runs(&left, &right, &DiffOptions::default());
        assert_eq!(result.entries[1].status, DiffStatus::MissingLeft);
        assert_eq!(result.entries[1].changes[0].kind, DeltaKind::Added);

        let reversed = diff_runs(&right, &left, &DiffOptions::default());
        assert_eq!(reversed.entries[1].status, DiffStatus::MissingRight);
        assert_eq!(reversed.entries[1].changes[0].kind, DeltaKind::Removed);
    }

    #[test]
    fn test_divergence_locator_symmetric() {
        let left = run(
            "run-a",
            vec![
                step(1, StepType::ToolRequest, json!({"status": "called"})),
                step(2, StepType::ToolResponse, json!({"result": 1})),
            ],
        );
        let right = run(
            "run-b",
            vec![
                step(1, StepType::ToolRequest, json!({"status": "called"})),
                step(2, StepType::ToolResponse, json!({"result": 2})),
            ],
        );
        let forward = diff_runs(&left, &right, &DiffOptions::default());
        let backward = diff_runs(&right, &left, &DiffOptions::default());
        assert_eq!(
            forward.first_divergence().map(|entry| entry.index),
            backward.first_divergence().map(|entry| entry.index)
        );
    }

    #[test]
    fn test_volatile_metadata_ignored_unless_strict() {
        let mut left_step = step(1, StepType::ModelResponse, json!({"content": "same"}));
        let mut right_step = left_step.clone();
        left_step.metadata.insert("duration_ms".to_string(), json!(10));
        right_step.metadata.insert("duration_ms".to_string(), json!(90));
        // Hashes already ignore volatile keys, so recompute changes nothing.
        let left_step = left_step.with_hash().unwrap();
        let right_step = right_step.with_hash().unwrap();

        let left = run("run-a", vec![left_step]);
        let right = run("run-b", vec![right_step]);

        let relaxed = diff_runs(&left, &right, &DiffOptions::default());
        assert!(relaxed.identical());

        // Strict surfaces the volatile drift as deltas, but the entries'
        // status is still hash-based.
        let mut changed_right = right.clone();
        changed_right.steps[0].output = json!({"content": "different"});
        changed_right.steps[0] = changed_right.steps[0].with_hash().unwrap();
        let strict = diff_runs(
            &left,
            &changed_right,
            &DiffOptions {
                strict: true,
                ..DiffOptions::default()
            },
        );
        let entry = strict.first_divergence().unwrap();
        assert!(entry
            .changes
            .iter()
            .any(|change| change.path == "/metadata/duration_ms"));
    }

    #[test]
    fn test_truncation_cap() {
        let mut left_output = Map::new();
        let mut right_output = Map::new();
        for position in 0..50 {
            left_output.insert(format!("key{position:02}"), json!("left"));
            right_output.insert(format!("key{position:02}"), json!("right"));
        }
        let left = run(
            "run-a",
            vec![step(1, StepType::ToolResponse, Value::Object(left_output))],
        );
        let right = run(
            "run-b",
            vec![step(1, StepType::ToolResponse, Value::Object(right_output))],
        );

        let result = diff_runs(
            &left,
            &right,
            &DiffOptions {
                max_changes_per_step: 8,
                ..DiffOptions::default()
            },
        );
        let entry = result.first_divergence().unwrap();
        assert!(entry.truncated_changes);
        assert_eq!(entry.changes.len(), 8);
    }

    #[test]
    fn test_first_only_stops_scanning() {
        let left = run(
            "run-a",
            vec![
                step(1, StepType::ToolResponse, json!({"result": 1})),
                step(2, StepType::ToolResponse, json!({"result": 2})),
                step(3, StepType::ToolResponse, json!({"result": 3})),
            ],
        );
        let mut right = left.clone();
        right.steps[1] = step(2, StepType::ToolResponse, json!({"result": 99}));
        right.steps[2] = step(3, StepType::ToolResponse, json!({"result": 98}));

        let result = diff_runs(
            &left,
            &right,
            &DiffOptions {
                first_only: true,
                ..DiffOptions::default()
            },
        );
        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.first_divergence().unwrap().index, 1);
    }

    #[test]
    fn test_context_extraction() {
        let left = run("run-a", vec![step(1, StepType::ModelResponse, json!({"content": "a"}))]);
        let right = run("run-b", vec![step(1, StepType::ModelResponse, json!({"content": "b"}))]);
        let result = diff_runs(&left, &right, &DiffOptions::default());
        let entry = result.first_divergence().unwrap();
        assert_eq!(entry.context["model"], json!("m1"));
    }

    #[test]
    fn test_type_change_reported() {
        let left = run("run-a", vec![step(1, StepType::ToolRequest, json!({}))]);
        let right = run("run-b", vec![step(1, StepType::ToolResponse, json!({}))]);
        let result = diff_runs(&left, &right, &DiffOptions::default());
        let entry = result.first_divergence().unwrap();
        assert_eq!(entry.status, DiffStatus::Changed);
        assert_eq!(entry.changes[0].path, "/type");
    }
}
