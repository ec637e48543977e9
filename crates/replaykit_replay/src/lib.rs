//! Deterministic offline replay for ReplayKit.
//!
//! Stub replay re-emits recorded outputs with a pinned clock and seed
//! under a network-deny guard; hybrid replay substitutes selected step
//! outputs from a second artifact. Given identical inputs the output
//! artifact is byte-identical.

pub mod config;
pub mod engine;
pub mod error;
pub mod guard;
pub mod guardrails;

pub use config::{normalize_fixed_clock, HybridReplayPolicy, ReplayConfig};
pub use engine::{
    replay_hybrid_run, replay_stub_run, write_replay_hybrid_artifact, write_replay_stub_artifact,
};
pub use error::{ReplayError, ReplayResult};
pub use guard::{ensure_network_allowed, guarded_connect, with_offline_guard, NetworkGuard};
pub use guardrails::{
    detect_diff_nondeterminism, detect_run_nondeterminism, guardrail_report, GuardrailMode,
    GuardrailReport, GuardrailStatus, NondeterminismFinding, NondeterminismKind,
};
