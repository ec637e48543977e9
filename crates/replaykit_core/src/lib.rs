//! ReplayKit core types.
//!
//! Pure shared types with no I/O: run and step identifiers, the closed
//! step-type set, and the artifact schema version.

#![warn(missing_docs)]

pub mod error;
pub mod id;
pub mod types;
pub mod version;

pub use error::{CoreError, CoreResult};
pub use id::{RunId, StepId};
pub use types::StepType;
pub use version::ArtifactVersion;
