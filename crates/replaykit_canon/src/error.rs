//! Canonicalization errors.

/// Canonicalization result type
pub type CanonResult<T> = Result<T, CanonError>;

/// Errors raised while producing canonical bytes.
///
/// The value domain itself (`serde_json::Value`) cannot hold duplicate
/// keys, cycles, or non-finite numbers, so those rejections surface at the
/// boundary where foreign data becomes a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CanonError {
    /// NaN or infinity offered to the canonical number domain
    #[error("NaN and infinity are not supported in canonical JSON")]
    NonFiniteNumber,

    /// Serialization to canonical bytes failed
    #[error("canonical JSON serialization failed: {message}")]
    Serialize {
        /// Underlying serializer message
        message: String,
    },
}

impl CanonError {
    /// Stable machine code for tooling output.
    #[must_use]
    pub fn machine_code(&self) -> &'static str {
        match self {
            Self::NonFiniteNumber => "non_finite_number",
            Self::Serialize { .. } => "invalid_json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CanonError::NonFiniteNumber;
        assert!(err.to_string().contains("NaN"));
        assert_eq!(err.machine_code(), "non_finite_number");
    }
}
