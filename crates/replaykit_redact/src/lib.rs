//! Security-first redaction for ReplayKit capture payloads.
//!
//! Two orthogonal axes applied before persistence: field-name masking and
//! value-pattern masking, plus configurable path-pattern masking. Policies
//! can add to the defaults but never remove from them.

pub mod engine;
pub mod policy;

pub use engine::redact_value;
pub use policy::{
    RedactError, RedactResult, RedactionConfig, RedactionPolicy, DEFAULT_POLICY_VERSION, MASK,
};
