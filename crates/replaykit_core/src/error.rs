//! Core error types shared across ReplayKit crates.

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by core identifier and version parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Artifact version string is not `MAJOR.MINOR`
    #[error("invalid artifact version: {value}")]
    InvalidVersion {
        /// The rejected version string
        value: String,
    },

    /// Step type string is outside the closed set
    #[error("unsupported step type: {value}")]
    UnknownStepType {
        /// The rejected type string
        value: String,
    },

    /// Step id does not match `step-NNNNNN`
    #[error("invalid step id: {value}")]
    InvalidStepId {
        /// The rejected id string
        value: String,
    },
}

impl CoreError {
    /// Stable machine code for tooling output.
    #[must_use]
    pub fn machine_code(&self) -> &'static str {
        match self {
            Self::InvalidVersion { .. } => "invalid_version",
            Self::UnknownStepType { .. } => "unknown_step_type",
            Self::InvalidStepId { .. } => "invalid_step_id",
        }
    }
}
