//! Capture subsystem errors.

use crate::policy::Boundary;
use replaykit_canon::CanonError;
use replaykit_redact::RedactError;

/// Capture result type
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Errors raised by the capture core.
///
/// Policy denials are recoverable for the embedding application, but the
/// denied boundary is never executed and is also recorded as an
/// `error.event` step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// Boundary allow bit is off
    #[error("{boundary} boundary denied by policy. Set allow_{boundary}=true to capture {boundary} calls.")]
    BoundaryDenied {
        /// The denied boundary
        boundary: Boundary,
    },

    /// HTTP host filtered by the allow/block lists
    #[error("http boundary denied by policy for host '{host}'. {hint}")]
    HostBlocked {
        /// The filtered host
        host: String,
        /// How to permit the call
        hint: String,
    },

    /// Canonicalization failed while hashing a step
    #[error(transparent)]
    Canon(#[from] CanonError),

    /// Redaction policy construction failed
    #[error(transparent)]
    Redact(#[from] RedactError),
}

impl CaptureError {
    /// Stable machine code for tooling output.
    #[must_use]
    pub fn machine_code(&self) -> &'static str {
        match self {
            Self::BoundaryDenied { .. } => "boundary_denied",
            Self::HostBlocked { .. } => "host_blocked",
            Self::Canon(err) => err.machine_code(),
            Self::Redact(err) => err.machine_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denied_message_names_boundary() {
        let err = CaptureError::BoundaryDenied {
            boundary: Boundary::Model,
        };
        assert_eq!(
            err.to_string(),
            "model boundary denied by policy. Set allow_model=true to capture model calls."
        );
        assert_eq!(err.machine_code(), "boundary_denied");
    }

    #[test]
    fn test_host_blocked_message() {
        let err = CaptureError::HostBlocked {
            host: "internal.example.com".to_string(),
            hint: "Remove it from blocked_hosts to allow this call.".to_string(),
        };
        assert!(err.to_string().contains("internal.example.com"));
        assert_eq!(err.machine_code(), "host_blocked");
    }
}
