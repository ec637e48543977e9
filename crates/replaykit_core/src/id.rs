//! Identifiers for ReplayKit runs and steps.
//!
//! Run ids are free-form stable strings; step ids follow the fixed
//! `step-NNNNNN` shape and are monotonic within a run.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Run identifier - identifies a single captured execution
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Create from an existing identifier string
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a fresh random run id
    #[must_use]
    pub fn fresh() -> Self {
        Self(format!("run-{}", Uuid::new_v4()))
    }

    /// Get as string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RunId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RunId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Step identifier - `step-NNNNNN`, monotonic and gap-free within a run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(String);

impl StepId {
    /// Width of the zero-padded counter component
    pub const COUNTER_WIDTH: usize = 6;

    /// Create from a 1-based step counter
    #[must_use]
    pub fn from_counter(counter: u64) -> Self {
        Self(format!("step-{counter:06}"))
    }

    /// Parse an existing step id string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not `step-` followed by digits.
    pub fn parse(value: &str) -> CoreResult<Self> {
        let digits = value.strip_prefix("step-").ok_or_else(|| CoreError::InvalidStepId {
            value: value.to_string(),
        })?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidStepId {
                value: value.to_string(),
            });
        }
        Ok(Self(value.to_string()))
    }

    /// Get as string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 1-based counter encoded in the id, if well-formed
    #[must_use]
    pub fn counter(&self) -> Option<u64> {
        self.0.strip_prefix("step-").and_then(|s| s.parse().ok())
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
