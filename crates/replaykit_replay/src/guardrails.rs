//! Determinism guardrails.
//!
//! Inspects runs for indicators of unseeded randomness or unstable time
//! reads (via well-known metadata keys), and diffs for changes under
//! volatile tokens. Modes: `off` records nothing, `warn` records findings
//! without failing, `fail` aborts the operation.

use replaykit_artifact::Run;
use replaykit_diff::{DiffStatus, RunDiffResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

const RANDOM_USAGE_KEYS: &[&str] = &["random_enabled", "random_usage", "random_used", "uses_random"];
const RANDOM_SEED_KEYS: &[&str] = &["random_seed", "replay_seed", "rng_seed", "seed"];
const TIME_USAGE_KEYS: &[&str] = &[
    "clock_used",
    "time_usage",
    "time_used",
    "uses_datetime_now",
    "uses_time",
    "uses_time_now",
];
const TIME_FIXED_KEYS: &[&str] = &["clock_fixed", "fixed_clock", "replay_fixed_clock", "time_fixed"];

const RANDOM_VOLATILE_TOKENS: &[&str] =
    &["nonce", "rand", "random", "request_id", "span_id", "trace_id", "uuid"];
const TIME_VOLATILE_TOKENS: &[&str] = &[
    "clock",
    "created_at",
    "ended_at",
    "started_at",
    "time",
    "timestamp",
    "updated_at",
];

/// Guardrail enforcement mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailMode {
    /// Do not inspect at all
    #[default]
    Off,
    /// Record findings without failing
    Warn,
    /// Abort the operation on any finding
    Fail,
}

impl GuardrailMode {
    /// The wire string for this mode
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Warn => "warn",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for GuardrailMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GuardrailMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "warn" => Ok(Self::Warn),
            "fail" => Ok(Self::Fail),
            other => Err(format!(
                "invalid nondeterminism mode '{other}'; supported modes: off, warn, fail"
            )),
        }
    }
}

/// Kind of nondeterminism indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NondeterminismKind {
    /// Randomness used without a stable seed marker
    RandomUnseeded,
    /// Time read without a fixed clock marker
    TimeUnstable,
}

/// One nondeterminism indicator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NondeterminismFinding {
    /// Indicator kind
    pub kind: NondeterminismKind,
    /// JSON-pointer path of the triggering key
    pub path: String,
    /// What was detected
    pub message: String,
    /// Which input the finding came from
    pub source: String,
}

/// Guardrail outcome status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailStatus {
    /// Inspection disabled
    Off,
    /// No findings
    Clear,
    /// Findings recorded without failing
    Warn,
    /// Findings abort the operation
    Fail,
}

/// Structured guardrail report attached to replay/assert output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailReport {
    /// Enforcement mode that ran
    pub mode: GuardrailMode,
    /// Outcome status
    pub status: GuardrailStatus,
    /// Number of findings
    pub count: usize,
    /// The findings themselves
    pub findings: Vec<NondeterminismFinding>,
}

/// Build the report for a mode and set of findings.
#[must_use]
pub fn guardrail_report(mode: GuardrailMode, findings: Vec<NondeterminismFinding>) -> GuardrailReport {
    let status = match mode {
        GuardrailMode::Off => GuardrailStatus::Off,
        _ if findings.is_empty() => GuardrailStatus::Clear,
        GuardrailMode::Warn => GuardrailStatus::Warn,
        GuardrailMode::Fail => GuardrailStatus::Fail,
    };
    GuardrailReport {
        mode,
        status,
        count: findings.len(),
        findings,
    }
}

#[derive(Default)]
struct KeyObservations {
    random_usage: Vec<String>,
    random_seed: Vec<String>,
    time_usage: Vec<String>,
    time_fixed: Vec<String>,
}

/// Inspect a run for nondeterminism indicators.
#[must_use]
pub fn detect_run_nondeterminism(run: &Run, run_label: &str) -> Vec<NondeterminismFinding> {
    let mut observations = KeyObservations::default();

    walk_mapping(
        &run.environment_fingerprint,
        "/environment_fingerprint",
        &mut observations,
    );
    walk_mapping(&run.runtime_versions, "/runtime_versions", &mut observations);
    for (index, step) in run.steps.iter().enumerate() {
        let base = format!("/steps/{index}");
        walk_value(&step.input, &format!("{base}/input"), &mut observations);
        walk_value(&step.output, &format!("{base}/output"), &mut observations);
        walk_mapping(&step.metadata, &format!("{base}/metadata"), &mut observations);
    }

    let mut findings = Vec::new();
    if let Some(first) = observations.random_usage.first() {
        if observations.random_seed.is_empty() {
            findings.push(NondeterminismFinding {
                kind: NondeterminismKind::RandomUnseeded,
                path: first.clone(),
                message: "randomness usage detected without a stable seed marker (expected one \
                          of: seed/random_seed/rng_seed/replay_seed)"
                    .to_string(),
                source: run_label.to_string(),
            });
        }
    }
    if let Some(first) = observations.time_usage.first() {
        if observations.time_fixed.is_empty() {
            findings.push(NondeterminismFinding {
                kind: NondeterminismKind::TimeUnstable,
                path: first.clone(),
                message: "time usage detected without a fixed clock marker (expected one of: \
                          fixed_clock/time_fixed/replay_fixed_clock)"
                    .to_string(),
                source: run_label.to_string(),
            });
        }
    }
    findings
}

/// Inspect diff changes for volatile random/time indicators.
#[must_use]
pub fn detect_diff_nondeterminism(diff: &RunDiffResult, source: &str) -> Vec<NondeterminismFinding> {
    let mut findings = Vec::new();
    let mut seen = BTreeSet::new();

    for entry in &diff.entries {
        if entry.status == DiffStatus::Identical {
            continue;
        }
        for change in &entry.changes {
            let tokens = path_tokens(&change.path);
            let random_hits: Vec<&str> = RANDOM_VOLATILE_TOKENS
                .iter()
                .copied()
                .filter(|token| tokens.contains(*token))
                .collect();
            if !random_hits.is_empty() {
                push_unique(
                    &mut findings,
                    &mut seen,
                    NondeterminismFinding {
                        kind: NondeterminismKind::RandomUnseeded,
                        path: format!("/steps/{}{}", entry.index, change.path),
                        message: format!(
                            "diff changed a random-volatile field ({})",
                            random_hits.join(", ")
                        ),
                        source: source.to_string(),
                    },
                );
            }
            let time_hits: Vec<&str> = TIME_VOLATILE_TOKENS
                .iter()
                .copied()
                .filter(|token| tokens.contains(*token))
                .collect();
            if !time_hits.is_empty() {
                push_unique(
                    &mut findings,
                    &mut seen,
                    NondeterminismFinding {
                        kind: NondeterminismKind::TimeUnstable,
                        path: format!("/steps/{}{}", entry.index, change.path),
                        message: format!(
                            "diff changed a time-volatile field ({})",
                            time_hits.join(", ")
                        ),
                        source: source.to_string(),
                    },
                );
            }
        }
    }
    findings
}

fn walk_mapping(mapping: &Map<String, Value>, base: &str, observations: &mut KeyObservations) {
    for (key, child) in mapping {
        let path = format!("{base}/{}", escape_pointer(key));
        observe_key(key, child, &path, observations);
        walk_value(child, &path, observations);
    }
}

fn walk_value(value: &Value, base: &str, observations: &mut KeyObservations) {
    match value {
        Value::Object(map) => walk_mapping(map, base, observations),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                walk_value(item, &format!("{base}/{index}"), observations);
            }
        }
        _ => {}
    }
}

fn observe_key(key: &str, value: &Value, path: &str, observations: &mut KeyObservations) {
    let lowered = key.to_ascii_lowercase();
    if RANDOM_USAGE_KEYS.contains(&lowered.as_str()) && truthy(value) {
        observations.random_usage.push(path.to_string());
    }
    if RANDOM_SEED_KEYS.contains(&lowered.as_str()) && stable_value(value) {
        observations.random_seed.push(path.to_string());
    }
    if TIME_USAGE_KEYS.contains(&lowered.as_str()) && truthy(value) {
        observations.time_usage.push(path.to_string());
    }
    if TIME_FIXED_KEYS.contains(&lowered.as_str()) && stable_value(value) {
        observations.time_fixed.push(path.to_string());
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => {
            matches!(text.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
        }
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::Null => false,
        _ => true,
    }
}

fn stable_value(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(_) => true,
        Value::String(text) => !text.trim().is_empty(),
        Value::Null => false,
        _ => true,
    }
}

fn path_tokens(path: &str) -> BTreeSet<&str> {
    path.split('/')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

fn push_unique(
    findings: &mut Vec<NondeterminismFinding>,
    seen: &mut BTreeSet<(NondeterminismKind, String, String)>,
    finding: NondeterminismFinding,
) {
    let key = (finding.kind, finding.source.clone(), finding.path.clone());
    if seen.insert(key) {
        findings.push(finding);
    }
}

fn escape_pointer(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use replaykit_artifact::Step;
    use replaykit_core::{RunId, StepId, StepType};
    use replaykit_diff::{diff_runs, DiffOptions};
    use serde_json::json;

    fn run_with_metadata(metadata: Value) -> Run {
        let mut run = Run::new(RunId::new("run-guard-1"), "2026-02-21T00:00:00Z");
        let metadata = match metadata {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        run.steps.push(
            Step::new(
                StepId::from_counter(1),
                StepType::ToolResponse,
                json!({}),
                json!({}),
                metadata,
            )
            .with_hash()
            .unwrap(),
        );
        run
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("warn".parse::<GuardrailMode>().unwrap(), GuardrailMode::Warn);
        assert_eq!("FAIL".parse::<GuardrailMode>().unwrap(), GuardrailMode::Fail);
        assert!("loud".parse::<GuardrailMode>().is_err());
    }

    #[test]
    fn test_random_usage_without_seed_flagged() {
        let run = run_with_metadata(json!({"uses_random": true}));
        let findings = detect_run_nondeterminism(&run, "source");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, NondeterminismKind::RandomUnseeded);
        assert!(findings[0].path.contains("/steps/0/metadata"));
    }

    #[test]
    fn test_random_usage_with_seed_clear() {
        let run = run_with_metadata(json!({"uses_random": true, "seed": 7}));
        assert!(detect_run_nondeterminism(&run, "source").is_empty());
    }

    #[test]
    fn test_time_usage_without_fixed_clock_flagged() {
        let run = run_with_metadata(json!({"uses_time": "yes"}));
        let findings = detect_run_nondeterminism(&run, "source");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, NondeterminismKind::TimeUnstable);
    }

    #[test]
    fn test_replay_runtime_markers_satisfy_guardrails() {
        let mut run = run_with_metadata(json!({"uses_random": true, "uses_time": true}));
        run.runtime_versions.insert("replay_seed".to_string(), json!("7"));
        run.runtime_versions
            .insert("replay_fixed_clock".to_string(), json!("2026-02-22T00:00:00.000Z"));
        assert!(detect_run_nondeterminism(&run, "source").is_empty());
    }

    #[test]
    fn test_diff_volatile_tokens_flagged() {
        let left = run_with_metadata(json!({"request_id": "req-1"}));
        let right = run_with_metadata(json!({"request_id": "req-2"}));
        let diff = diff_runs(
            &left,
            &right,
            &DiffOptions {
                strict: true,
                ..DiffOptions::default()
            },
        );
        let findings = detect_diff_nondeterminism(&diff, "diff");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, NondeterminismKind::RandomUnseeded);
        assert!(findings[0].path.starts_with("/steps/0/metadata"));
    }

    #[test]
    fn test_report_statuses() {
        let finding = NondeterminismFinding {
            kind: NondeterminismKind::TimeUnstable,
            path: "/x".to_string(),
            message: "m".to_string(),
            source: "s".to_string(),
        };
        assert_eq!(guardrail_report(GuardrailMode::Off, vec![]).status, GuardrailStatus::Off);
        assert_eq!(
            guardrail_report(GuardrailMode::Warn, vec![]).status,
            GuardrailStatus::Clear
        );
        assert_eq!(
            guardrail_report(GuardrailMode::Warn, vec![finding.clone()]).status,
            GuardrailStatus::Warn
        );
        assert_eq!(
            guardrail_report(GuardrailMode::Fail, vec![finding]).status,
            GuardrailStatus::Fail
        );
    }
}
