//! Deterministic assembly of streamed model output.

use serde_json::{json, Value};

/// Build the `model.response` output value for a streamed response: the
/// ordered delta list (1-based indices), a completion flag, and
/// `assembled_text`, the in-order concatenation replay and diff consume.
#[must_use]
pub fn assemble_stream_output(deltas: &[String], completed: bool) -> Value {
    let events: Vec<Value> = deltas
        .iter()
        .enumerate()
        .map(|(position, delta)| json!({"index": position + 1, "delta": delta}))
        .collect();
    let assembled: String = deltas.concat();
    json!({
        "stream": {"events": events, "completed": completed},
        "assembled_text": assembled,
    })
}
