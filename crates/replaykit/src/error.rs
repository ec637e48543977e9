//! Facade error type and the exit-code contract.

use replaykit_artifact::{ArtifactError, MigrationError};
use replaykit_canon::CanonError;
use replaykit_capture::CaptureError;
use replaykit_diff::DiffError;
use replaykit_redact::RedactError;
use replaykit_replay::ReplayError;

/// Facade result type
pub type ReplayKitResult<T> = Result<T, ReplayKitError>;

/// Any error surfaced by a ReplayKit operation.
///
/// Every variant carries a stable machine code; the exit-code contract
/// for tools built on the core is 0 = clean, 1 = divergence/invalid
/// input/verification failure, 2 = usage error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReplayKitError {
    /// Artifact read/write/verification failed
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// Migration failed
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// Capture boundary or policy failed
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Replay failed
    #[error(transparent)]
    Replay(#[from] ReplayError),

    /// Diff or snapshot workflow failed
    #[error(transparent)]
    Diff(#[from] DiffError),

    /// Redaction policy construction failed
    #[error(transparent)]
    Redact(#[from] RedactError),

    /// Canonicalization failed
    #[error(transparent)]
    Canon(#[from] CanonError),

    /// Requested redaction profile does not exist
    #[error("unknown redaction profile '{profile}'. Supported profiles: default, none")]
    UnknownRedactionProfile {
        /// The rejected profile name
        profile: String,
    },

    /// Operation inputs are inconsistent (e.g. hybrid replay without a
    /// rerun source)
    #[error("invalid operation input: {message}")]
    UsageError {
        /// What was wrong
        message: String,
    },
}

impl ReplayKitError {
    /// Stable machine code for tooling output.
    #[must_use]
    pub fn machine_code(&self) -> &'static str {
        match self {
            Self::Artifact(err) => err.machine_code(),
            Self::Migration(err) => err.machine_code(),
            Self::Capture(err) => err.machine_code(),
            Self::Replay(err) => err.machine_code(),
            Self::Diff(err) => err.machine_code(),
            Self::Redact(err) => err.machine_code(),
            Self::Canon(err) => err.machine_code(),
            Self::UnknownRedactionProfile { .. } => "unknown_redaction_profile",
            Self::UsageError { .. } => "usage_error",
        }
    }

    /// Process exit code under the tool contract.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        let usage = match self {
            Self::Replay(err) => err.is_usage_error(),
            Self::Diff(err) => err.is_usage_error(),
            Self::Redact(_) | Self::UnknownRedactionProfile { .. } | Self::UsageError { .. } => true,
            _ => false,
        };
        if usage {
            2
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let usage = ReplayKitError::UsageError {
            message: "hybrid replay requires rerun_from".to_string(),
        };
        assert_eq!(usage.exit_code(), 2);

        let verification: ReplayKitError = ArtifactError::ChecksumMismatch {
            expected: "sha256:aa".to_string(),
            actual: "sha256:bb".to_string(),
        }
        .into();
        assert_eq!(verification.exit_code(), 1);
        assert_eq!(verification.machine_code(), "checksum_mismatch");
    }

    #[test]
    fn test_unknown_profile() {
        let err = ReplayKitError::UnknownRedactionProfile {
            profile: "loose".to_string(),
        };
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("default, none"));
    }
}
