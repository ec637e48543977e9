//! Artifact model and I/O for ReplayKit `.rpk` files.
//!
//! An artifact is a canonical JSON envelope holding one run: ordered typed
//! steps with content-addressed hashes, a signed-checksum integrity
//! contract, and a `MAJOR.MINOR` schema version. Reads verify shape,
//! checksum, and (optionally) signature before a run is constructed;
//! writes are atomic.

pub mod envelope;
pub mod error;
pub mod io;
pub mod migration;
pub mod model;
pub mod schema;
pub mod signing;

pub use envelope::{build_envelope, envelope_checksum, envelope_version, run_from_envelope, verify_checksum};
pub use error::{ArtifactError, ArtifactResult, MigrationError, MigrationResult};
pub use io::{read_artifact, read_raw_envelope, write_artifact, write_artifact_with, SigningRequest, WriteOptions};
pub use migration::{migrate_envelope, migrate_file, MigrationStatus, MigrationSummary};
pub use model::{Run, Step};
pub use schema::SchemaValidator;
pub use signing::{
    compute_artifact_hmac, sign_envelope, signing_key_from_env, verify_signature,
    SignatureStatus, SignatureVerification, SIGNATURE_ALGORITHM, SIGNING_KEY_ENV_VAR,
    SIGNING_KEY_ID_ENV_VAR,
};
