//! Boundary recording: model, tool, and HTTP call capture.
//!
//! Each boundary checks its policy bit first. A denied boundary is
//! recorded as an `error.event` step and also surfaces to the caller, so
//! artifacts always explain why a boundary was skipped.

use crate::error::CaptureResult;
use crate::policy::Boundary;
use crate::scope::CaptureScope;
use crate::stream::assemble_stream_output;
use replaykit_artifact::Step;
use replaykit_core::StepType;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Body placeholder written when `capture_http_bodies` is off.
pub const BODY_OMITTED: &str = "<omitted by policy>";

/// An observed HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP method
    pub method: String,
    /// Full request URL
    pub url: String,
    /// Request headers
    pub headers: BTreeMap<String, String>,
    /// Request body
    pub body: Value,
}

/// An observed HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status_code: u16,
    /// Response headers
    pub headers: BTreeMap<String, String>,
    /// Response body
    pub body: Value,
}

impl CaptureScope {
    /// Record one observed model call as `model.request` + `model.response`.
    ///
    /// # Errors
    ///
    /// Returns a policy error (after recording an `error.event`) when model
    /// boundaries are denied.
    pub fn record_model_call(
        &self,
        model: &str,
        input: Value,
        output: Value,
        extra_metadata: Map<String, Value>,
    ) -> CaptureResult<(Step, Step)> {
        self.check_boundary(Boundary::Model, model)?;
        let metadata = boundary_metadata(Boundary::Model, &[("model", model)], extra_metadata);

        let request = self.record_step(
            StepType::ModelRequest,
            json!({"model": model, "input": input}),
            json!({"status": "sent"}),
            metadata.clone(),
        )?;
        let response = self.record_step(
            StepType::ModelResponse,
            json!({"model": model}),
            json!({"output": output}),
            metadata,
        )?;
        Ok((request, response))
    }

    /// Record one observed streaming model call. The response step stores
    /// the ordered delta list, a completion flag, and the deterministic
    /// assembled text that replay and diff consume.
    ///
    /// # Errors
    ///
    /// Returns a policy error (after recording an `error.event`) when model
    /// boundaries are denied.
    pub fn record_model_stream(
        &self,
        model: &str,
        input: Value,
        deltas: &[String],
        completed: bool,
        extra_metadata: Map<String, Value>,
    ) -> CaptureResult<(Step, Step)> {
        self.check_boundary(Boundary::Model, model)?;
        let mut metadata = boundary_metadata(Boundary::Model, &[("model", model)], extra_metadata);
        metadata.insert("stream".to_string(), Value::Bool(true));

        let request = self.record_step(
            StepType::ModelRequest,
            json!({"model": model, "input": input}),
            json!({"status": "sent"}),
            metadata.clone(),
        )?;
        let response = self.record_step(
            StepType::ModelResponse,
            json!({"model": model}),
            assemble_stream_output(deltas, completed),
            metadata,
        )?;
        Ok((request, response))
    }

    /// Record one observed tool call as `tool.request` + `tool.response`.
    ///
    /// # Errors
    ///
    /// Returns a policy error (after recording an `error.event`) when tool
    /// boundaries are denied.
    pub fn record_tool_call(
        &self,
        tool: &str,
        args: Value,
        result: Value,
        extra_metadata: Map<String, Value>,
    ) -> CaptureResult<(Step, Step)> {
        self.check_boundary(Boundary::Tool, tool)?;
        let metadata = boundary_metadata(Boundary::Tool, &[("tool", tool)], extra_metadata);

        let request = self.record_step(
            StepType::ToolRequest,
            json!({"tool": tool, "args": args}),
            json!({"status": "called"}),
            metadata.clone(),
        )?;
        let response = self.record_step(
            StepType::ToolResponse,
            json!({"tool": tool}),
            json!({"result": result}),
            metadata,
        )?;
        Ok((request, response))
    }

    /// Record one observed HTTP call as `tool.request` + `tool.response`
    /// with `boundary=http` metadata. Bodies are omitted entirely unless
    /// the policy opts in.
    ///
    /// # Errors
    ///
    /// Returns a policy error (after recording an `error.event`) when HTTP
    /// boundaries are denied or the host is filtered.
    pub fn record_http_call(
        &self,
        request: &HttpRequest,
        response: &HttpResponse,
        extra_metadata: Map<String, Value>,
    ) -> CaptureResult<(Step, Step)> {
        let method = request.method.to_ascii_uppercase();
        self.check_boundary(Boundary::Http, &request.url)?;
        let metadata = boundary_metadata(
            Boundary::Http,
            &[("method", &method), ("url", &request.url)],
            extra_metadata,
        );

        let capture_bodies = self.policy().capture_http_bodies;
        let request_body = body_or_placeholder(&request.body, capture_bodies);
        let response_body = body_or_placeholder(&response.body, capture_bodies);

        let request_step = self.record_step(
            StepType::ToolRequest,
            json!({
                "method": method,
                "url": request.url,
                "headers": request.headers,
                "body": request_body,
            }),
            json!({"status": "sent"}),
            metadata.clone(),
        )?;
        let response_step = self.record_step(
            StepType::ToolResponse,
            json!({"method": method, "url": request.url}),
            json!({
                "status_code": response.status_code,
                "headers": response.headers,
                "body": response_body,
            }),
            metadata,
        )?;
        Ok((request_step, response_step))
    }

    /// Record a wrapped-callee failure as an `error.event` step.
    ///
    /// # Errors
    ///
    /// Returns an error if step hashing fails.
    pub fn record_error(
        &self,
        boundary: Boundary,
        target: &str,
        error_type: &str,
        message: &str,
    ) -> CaptureResult<Step> {
        self.record_error_event(boundary, target, error_type, message, "runtime")
    }

    fn check_boundary(&self, boundary: Boundary, target: &str) -> CaptureResult<()> {
        if let Err(denial) = self.policy().check(boundary, target) {
            self.record_error_event(
                boundary,
                target,
                denial.machine_code(),
                &denial.to_string(),
                "policy",
            )?;
            tracing::warn!(boundary = %boundary, target, "boundary denied by policy");
            return Err(denial);
        }
        Ok(())
    }

    fn record_error_event(
        &self,
        boundary: Boundary,
        target: &str,
        error_type: &str,
        message: &str,
        kind: &str,
    ) -> CaptureResult<Step> {
        let mut metadata = Map::new();
        metadata.insert(
            "boundary".to_string(),
            Value::String(boundary.as_str().to_string()),
        );
        metadata.insert("kind".to_string(), Value::String(kind.to_string()));
        self.record_step(
            StepType::ErrorEvent,
            json!({"boundary": boundary.as_str(), "target": target}),
            json!({"error_type": error_type, "message": message}),
            metadata,
        )
    }
}

fn boundary_metadata(
    boundary: Boundary,
    pairs: &[(&str, &str)],
    extra: Map<String, Value>,
) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert(
        "boundary".to_string(),
        Value::String(boundary.as_str().to_string()),
    );
    for (key, value) in pairs {
        metadata.insert((*key).to_string(), Value::String((*value).to_string()));
    }
    for (key, value) in extra {
        metadata.insert(key, value);
    }
    metadata
}

fn body_or_placeholder(body: &Value, capture_bodies: bool) -> Value {
    if capture_bodies {
        body.clone()
    } else {
        Value::String(BODY_OMITTED.to_string())
    }
}
