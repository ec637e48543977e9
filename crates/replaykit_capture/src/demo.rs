//! The built-in demo run.
//!
//! A deterministic run spanning every boundary kind, with planted secrets
//! in every position redaction must cover: model input, tool output, HTTP
//! headers, and HTTP bodies.

use crate::boundary::{HttpRequest, HttpResponse};
use crate::error::CaptureResult;
use crate::policy::InterceptionPolicy;
use crate::scope::CaptureScope;
use replaykit_artifact::Run;
use replaykit_core::{RunId, StepType};
use replaykit_redact::RedactionPolicy;
use serde_json::{json, Map};
use std::collections::BTreeMap;

/// Default id of the demo run
pub const DEMO_RUN_ID: &str = "run-demo-001";

/// Pinned timestamp of the demo run
pub const DEMO_TIMESTAMP: &str = "2026-02-21T00:00:00Z";

/// Build the deterministic demo run with default policies.
///
/// # Errors
///
/// Returns an error if step hashing fails.
pub fn build_demo_run() -> CaptureResult<Run> {
    build_demo_run_with(
        InterceptionPolicy {
            capture_http_bodies: false,
            ..InterceptionPolicy::default()
        },
        RedactionPolicy::standard(),
    )
}

/// Build the deterministic demo run under explicit policies.
///
/// # Errors
///
/// Returns an error if a boundary is denied by `policy` or step hashing
/// fails.
pub fn build_demo_run_with(
    policy: InterceptionPolicy,
    redaction: RedactionPolicy,
) -> CaptureResult<Run> {
    let scope = CaptureScope::new(RunId::new(DEMO_RUN_ID))
        .with_timestamp(DEMO_TIMESTAMP)
        .with_policy(policy)
        .with_redaction(redaction);

    scope.record_step(
        StepType::PromptRender,
        json!({"template": "summarize", "variables": {"subject": "ReplayKit"}}),
        json!({"prompt": "Summarize ReplayKit"}),
        Map::new(),
    )?;

    scope.record_model_call(
        "gpt-4o-mini",
        json!({
            "messages": [{"role": "user", "content": "Summarize ReplayKit"}],
            "api_key": "sk-demo-model-key",
        }),
        json!({
            "content": "ReplayKit records and replays runs.",
            "token": "sk-demo-model-token",
        }),
        Map::new(),
    )?;

    scope.record_tool_call(
        "demo.search",
        json!({"query": "debugging"}),
        json!({"answer": "result for debugging", "token": "sk-demo-tool-token"}),
        Map::new(),
    )?;

    scope.record_http_call(
        &HttpRequest {
            method: "POST".to_string(),
            url: "https://api.example.com/v1/demo".to_string(),
            headers: BTreeMap::from([
                ("Authorization".to_string(), "Bearer sk-demo-http-key".to_string()),
                ("X-Trace-Id".to_string(), "trace-demo-001".to_string()),
            ]),
            body: json!({"token": "sk-demo-body-token", "q": "debugging"}),
        },
        &HttpResponse {
            status_code: 200,
            headers: BTreeMap::from([
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Set-Cookie".to_string(), "session=demo".to_string()),
            ]),
            body: json!({"ok": true, "email": "demo@example.com"}),
        },
        Map::new(),
    )?;

    scope.record_step(
        StepType::OutputFinal,
        json!({}),
        json!({"assistant_message": "ReplayKit records and replays runs."}),
        Map::new(),
    )?;

    Ok(scope.finalize())
}
