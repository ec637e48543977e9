//! Deterministic canonicalization for ReplayKit.
//!
//! Reduces arbitrary JSON values to a single byte-exact representation
//! suitable for hashing: sorted keys, normalized strings, stable number
//! forms. The same canonical form backs step hashes, artifact checksums,
//! and stable tool output.

pub mod error;
pub mod hash;
pub mod json;
pub mod value;
pub mod volatile;

pub use error::{CanonError, CanonResult};
pub use hash::{canonical_digest, compute_step_hash, Sha256Digest, HASH_PREFIX};
pub use json::{canonical_json, canonical_json_pretty, canonical_json_with, number_from_f64};
pub use value::{canonicalize, canonicalize_with, CanonOptions};
pub use volatile::{
    is_volatile_key, DURATION_METADATA_KEYS, REQUEST_ID_VOLATILE_MARKER, UNORDERED_LIST_KEYS,
    VOLATILE_METADATA_KEYS,
};
