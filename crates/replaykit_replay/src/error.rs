//! Replay subsystem errors.

use replaykit_artifact::ArtifactError;
use replaykit_canon::CanonError;

/// Replay result type
pub type ReplayResult<T> = Result<T, ReplayError>;

/// Errors raised by the replay core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplayError {
    /// Seed or fixed clock is unusable
    #[error("invalid replay configuration: {message}")]
    InvalidConfig {
        /// What was wrong
        message: String,
    },

    /// An outbound network attempt was made while the offline guard held
    #[error("offline replay forbids outbound network calls (target: {target})")]
    NetworkAttemptBlocked {
        /// The attempted target
        target: String,
    },

    /// Hybrid replay could not align the two sources
    #[error("hybrid alignment mismatch at step index {index}: {expected} vs {actual}")]
    AlignmentMismatch {
        /// First misaligned index
        index: usize,
        /// What the primary source holds there
        expected: String,
        /// What the rerun source holds there
        actual: String,
    },

    /// Determinism guardrails tripped in `fail` mode
    #[error("nondeterminism detected: {count} indicator(s)")]
    NondeterminismDetected {
        /// Number of findings
        count: usize,
    },

    /// Socket operation failed after the guard allowed it
    #[error("connect to {target} failed: {message}")]
    Io {
        /// The attempted target
        target: String,
        /// OS error message
        message: String,
    },

    /// Canonicalization failed
    #[error(transparent)]
    Canon(#[from] CanonError),

    /// Error surfaced by the artifact layer
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl ReplayError {
    /// Stable machine code for tooling output.
    #[must_use]
    pub fn machine_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "replay_config",
            Self::NetworkAttemptBlocked { .. } => "network_attempt_blocked",
            Self::AlignmentMismatch { .. } => "hybrid_alignment_mismatch",
            Self::NondeterminismDetected { .. } => "nondeterminism_detected",
            Self::Io { .. } => "io_error",
            Self::Canon(err) => err.machine_code(),
            Self::Artifact(err) => err.machine_code(),
        }
    }

    /// Whether this error is a usage error (exit code 2).
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }
}
