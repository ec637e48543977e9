//! Artifact and migration error types.

use replaykit_canon::CanonError;

/// Artifact result type
pub type ArtifactResult<T> = Result<T, ArtifactError>;

/// Migration result type
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Errors raised while reading, writing, or verifying artifacts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArtifactError {
    /// File contents are not valid JSON
    #[error("invalid JSON in artifact: {message}")]
    InvalidJson {
        /// Parser message
        message: String,
    },

    /// Artifact shape violates the schema for its version
    #[error("invalid artifact at {location}: {message}")]
    SchemaViolation {
        /// JSON-pointer location of the first violation
        location: String,
        /// Validator message
        message: String,
    },

    /// Artifact major version is not readable by this build
    #[error("unsupported artifact major version: {version}. Supported major: {supported}.x")]
    UnknownMajor {
        /// The artifact's version string
        version: String,
        /// The supported major
        supported: u32,
    },

    /// Checksum recomputed over the payload does not match the stored value
    #[error("artifact checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Checksum recomputed from content
        expected: String,
        /// Checksum stored in the envelope
        actual: String,
    },

    /// Signature required but absent
    #[error("artifact is unsigned")]
    SignatureMissing,

    /// Signature present but does not verify
    #[error("artifact signature mismatch")]
    SignatureMismatch,

    /// Signature algorithm is not supported
    #[error("unsupported signature algorithm: {algorithm}")]
    UnsupportedSignatureAlgorithm {
        /// The declared algorithm
        algorithm: String,
    },

    /// Signing key unavailable or unusable
    #[error("signing key unavailable: {message}")]
    KeyMissing {
        /// What was expected
        message: String,
    },

    /// Canonicalization failed
    #[error(transparent)]
    Canon(#[from] CanonError),

    /// Filesystem operation failed
    #[error("artifact I/O failed for {path}: {message}")]
    Io {
        /// The path involved
        path: String,
        /// OS error message
        message: String,
    },
}

impl ArtifactError {
    /// Stable machine code for tooling output.
    #[must_use]
    pub fn machine_code(&self) -> &'static str {
        match self {
            Self::InvalidJson { .. } => "invalid_json",
            Self::SchemaViolation { .. } => "schema_violation",
            Self::UnknownMajor { .. } => "unknown_major",
            Self::ChecksumMismatch { .. } => "checksum_mismatch",
            Self::SignatureMissing => "signature_missing",
            Self::SignatureMismatch => "signature_mismatch",
            Self::UnsupportedSignatureAlgorithm { .. } => "unsupported_signature_algorithm",
            Self::KeyMissing { .. } => "key_missing",
            Self::Canon(err) => err.machine_code(),
            Self::Io { .. } => "io_error",
        }
    }
}

/// Errors raised while migrating a prior schema major.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    /// Source version has no supported migration path
    #[error("unsupported source artifact version '{version}'. Supported versions: 0.9, 1.x")]
    UnsupportedVersion {
        /// The rejected version string
        version: String,
    },

    /// Source payload cannot be interpreted as a run
    #[error("malformed artifact payload: {message}")]
    MalformedPayload {
        /// What was wrong
        message: String,
    },

    /// Source checksum did not verify
    #[error("artifact checksum mismatch: expected {expected}, got {actual}")]
    ChecksumInvalid {
        /// Checksum recomputed from content
        expected: String,
        /// Checksum stored in the envelope
        actual: String,
    },

    /// Step hash recomputation failed
    #[error("step hash recomputation failed: {message}")]
    RecomputeFailed {
        /// Underlying message
        message: String,
    },

    /// Error surfaced by the artifact layer
    #[error(transparent)]
    Artifact(ArtifactError),
}

impl MigrationError {
    /// Stable machine code for tooling output.
    #[must_use]
    pub fn machine_code(&self) -> &'static str {
        match self {
            Self::UnsupportedVersion { .. } => "unsupported_version",
            Self::MalformedPayload { .. } => "malformed_payload",
            Self::ChecksumInvalid { .. } => "checksum_invalid",
            Self::RecomputeFailed { .. } => "recompute_failed",
            Self::Artifact(err) => err.machine_code(),
        }
    }
}

impl From<ArtifactError> for MigrationError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::ChecksumMismatch { expected, actual } => {
                Self::ChecksumInvalid { expected, actual }
            }
            ArtifactError::Canon(canon) => Self::RecomputeFailed {
                message: canon.to_string(),
            },
            other => Self::Artifact(other),
        }
    }
}
