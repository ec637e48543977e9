//! Diff and snapshot workflow errors.
//!
//! Divergence is never an error; only input problems surface here.

use replaykit_artifact::ArtifactError;

/// Diff result type
pub type DiffResult<T> = Result<T, DiffError>;

/// Errors raised by assertion and snapshot workflows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// Snapshot input is unusable (bad name, missing directory)
    #[error("invalid snapshot input: {message}")]
    SnapshotConfig {
        /// What was wrong
        message: String,
    },

    /// Error surfaced while reading or writing artifacts
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl DiffError {
    /// Stable machine code for tooling output.
    #[must_use]
    pub fn machine_code(&self) -> &'static str {
        match self {
            Self::SnapshotConfig { .. } => "snapshot_config",
            Self::Artifact(err) => err.machine_code(),
        }
    }

    /// Whether this error is a usage error (exit code 2) rather than a
    /// verification failure (exit code 1).
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Self::SnapshotConfig { .. })
    }
}
