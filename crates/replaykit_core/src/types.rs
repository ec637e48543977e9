//! The closed set of step types recorded at capture boundaries.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Step type - one observed boundary event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StepType {
    /// Prompt template rendered into a concrete prompt
    #[serde(rename = "prompt.render")]
    PromptRender,
    /// Model invocation issued
    #[serde(rename = "model.request")]
    ModelRequest,
    /// Model invocation completed
    #[serde(rename = "model.response")]
    ModelResponse,
    /// Tool or HTTP invocation issued
    #[serde(rename = "tool.request")]
    ToolRequest,
    /// Tool or HTTP invocation completed
    #[serde(rename = "tool.response")]
    ToolResponse,
    /// Policy denial or wrapped-callee failure
    #[serde(rename = "error.event")]
    ErrorEvent,
    /// Final output of the workflow
    #[serde(rename = "output.final")]
    OutputFinal,
}

impl StepType {
    /// All step types, in canonical declaration order
    pub const ALL: [StepType; 7] = [
        Self::PromptRender,
        Self::ModelRequest,
        Self::ModelResponse,
        Self::ToolRequest,
        Self::ToolResponse,
        Self::ErrorEvent,
        Self::OutputFinal,
    ];

    /// The wire string for this step type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PromptRender => "prompt.render",
            Self::ModelRequest => "model.request",
            Self::ModelResponse => "model.response",
            Self::ToolRequest => "tool.request",
            Self::ToolResponse => "tool.response",
            Self::ErrorEvent => "error.event",
            Self::OutputFinal => "output.final",
        }
    }

    /// Whether this type records a failure
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::ErrorEvent)
    }

    /// Parse a wire string into a step type
    ///
    /// # Errors
    ///
    /// Returns an error for strings outside the closed set.
    pub fn parse(value: &str) -> CoreResult<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == value)
            .ok_or_else(|| CoreError::UnknownStepType {
                value: value.to_string(),
            })
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StepType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
