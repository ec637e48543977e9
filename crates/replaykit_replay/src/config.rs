//! Replay configuration: pinned seed and clock, hybrid selection policy.

use crate::error::{ReplayError, ReplayResult};
use chrono::{DateTime, Utc};
use replaykit_core::StepType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Configuration for deterministic replay execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Pinned RNG seed
    pub seed: i64,
    /// Pinned clock, normalized to UTC milliseconds
    pub fixed_clock: String,
}

impl ReplayConfig {
    /// Build a config, normalizing the fixed clock.
    ///
    /// # Errors
    ///
    /// Returns an error if `fixed_clock` is not RFC 3339 with an offset.
    pub fn new(seed: i64, fixed_clock: &str) -> ReplayResult<Self> {
        Ok(Self {
            seed,
            fixed_clock: normalize_fixed_clock(fixed_clock)?,
        })
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            fixed_clock: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }
}

/// Normalize a fixed-clock value to the canonical UTC millisecond form.
///
/// # Errors
///
/// Returns an error if the value does not parse as an ISO-8601 timestamp
/// with timezone information.
pub fn normalize_fixed_clock(value: &str) -> ReplayResult<String> {
    let parsed = DateTime::parse_from_rfc3339(value.trim()).map_err(|err| {
        ReplayError::InvalidConfig {
            message: format!("fixed_clock must be an ISO-8601 timestamp with timezone: {err}"),
        }
    })?;
    Ok(parsed
        .with_timezone(&Utc)
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string())
}

/// Which steps hybrid replay takes from the rerun source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HybridReplayPolicy {
    /// Step types substituted from the rerun source
    #[serde(default)]
    pub rerun_step_types: BTreeSet<StepType>,
    /// Step ids substituted from the rerun source
    #[serde(default)]
    pub rerun_step_ids: BTreeSet<String>,
    /// Fail when step counts or types disagree at an aligned index
    #[serde(default)]
    pub strict_alignment: bool,
}

impl HybridReplayPolicy {
    /// Whether a step at an aligned index is taken from the rerun source.
    #[must_use]
    pub fn selects(&self, step_type: StepType, step_id: &str) -> bool {
        self.rerun_step_types.contains(&step_type) || self.rerun_step_ids.contains(step_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_normalization() {
        assert_eq!(
            normalize_fixed_clock("2026-02-22T00:00:00Z").unwrap(),
            "2026-02-22T00:00:00.000Z"
        );
        assert_eq!(
            normalize_fixed_clock("2026-02-22T03:30:00.5+03:30").unwrap(),
            "2026-02-22T00:00:00.500Z"
        );
    }

    #[test]
    fn test_fixed_clock_requires_offset() {
        let err = normalize_fixed_clock("2026-02-22T00:00:00").unwrap_err();
        assert_eq!(err.machine_code(), "replay_config");
        assert!(normalize_fixed_clock("not a time").is_err());
    }

    #[test]
    fn test_config_default() {
        let config = ReplayConfig::default();
        assert_eq!(config.seed, 0);
        assert_eq!(config.fixed_clock, "2026-01-01T00:00:00.000Z");
        // The default is already normalized.
        assert_eq!(
            normalize_fixed_clock(&config.fixed_clock).unwrap(),
            config.fixed_clock
        );
    }

    #[test]
    fn test_hybrid_policy_selection() {
        let policy = HybridReplayPolicy {
            rerun_step_types: BTreeSet::from([StepType::ModelResponse]),
            rerun_step_ids: BTreeSet::from(["step-000004".to_string()]),
            strict_alignment: false,
        };
        assert!(policy.selects(StepType::ModelResponse, "step-000001"));
        assert!(policy.selects(StepType::ToolResponse, "step-000004"));
        assert!(!policy.selects(StepType::ToolResponse, "step-000001"));
    }
}
