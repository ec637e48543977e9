//! Artifact schema version (`MAJOR.MINOR`).

use crate::error::{CoreError, CoreResult};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Artifact schema version
///
/// Serialized as the string `"MAJOR.MINOR"`. The reader accepts any minor
/// under a supported major; a mismatched major requires migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactVersion {
    /// Major component; a change requires migration
    pub major: u32,
    /// Minor component; additive within a major
    pub minor: u32,
}

impl ArtifactVersion {
    /// The current published schema version
    pub const CURRENT: ArtifactVersion = ArtifactVersion { major: 1, minor: 0 };

    /// The major version the reader accepts without migration
    pub const SUPPORTED_MAJOR: u32 = 1;

    /// The legacy pre-1.0 version the migrator understands
    pub const LEGACY: ArtifactVersion = ArtifactVersion { major: 0, minor: 9 };

    /// Create a new version
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse from a `MAJOR.MINOR` string
    ///
    /// # Errors
    ///
    /// Returns an error if the format is invalid.
    pub fn parse(value: &str) -> CoreResult<Self> {
        let trimmed = value.trim();
        let (major_raw, minor_raw) = trimmed.split_once('.').ok_or_else(|| CoreError::InvalidVersion {
            value: value.to_string(),
        })?;
        let parse_component = |raw: &str| -> CoreResult<u32> {
            if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
                return Err(CoreError::InvalidVersion {
                    value: value.to_string(),
                });
            }
            raw.parse().map_err(|_| CoreError::InvalidVersion {
                value: value.to_string(),
            })
        };
        Ok(Self {
            major: parse_component(major_raw)?,
            minor: parse_component(minor_raw)?,
        })
    }

    /// Whether a reader built for [`Self::SUPPORTED_MAJOR`] can read this version
    #[must_use]
    pub const fn is_reader_compatible(&self) -> bool {
        self.major == Self::SUPPORTED_MAJOR
    }
}

impl fmt::Display for ArtifactVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ArtifactVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ArtifactVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ArtifactVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(D::Error::custom)
    }
}
