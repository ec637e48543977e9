//! The volatile-metadata denylist.
//!
//! These keys are stripped before step hashing and ignored by default in
//! diff. Write-time hashing and read-time diff-ignore must stay in sync,
//! so both consume this single constant.

/// Metadata keys treated as non-semantic at all depths
pub const VOLATILE_METADATA_KEYS: &[&str] = &[
    "captured_at",
    "captured_ns",
    "created_at",
    "duration_ms",
    "elapsed_ms",
    "latency_ms",
    "pid",
    "span_id",
    "thread_id",
    "trace_id",
    "wall_time_ms",
];

/// Marker key that opts `request_id` into the volatile set for its mapping.
///
/// `request_id` is semantic unless the same mapping carries
/// `"request_id_volatile": true`; the marker is stripped with it.
pub const REQUEST_ID_VOLATILE_MARKER: &str = "request_id_volatile";

/// Keys whose array values hold unordered collections; canonicalization
/// sorts them by element encoding.
pub const UNORDERED_LIST_KEYS: &[&str] = &["capabilities", "labels", "tags"];

/// Metadata keys carrying step durations, in lookup priority order.
/// Consumed by the slowdown gate.
pub const DURATION_METADATA_KEYS: &[&str] =
    &["duration_ms", "latency_ms", "wall_time_ms", "elapsed_ms"];

/// Whether a metadata key (case-insensitive) is on the volatile denylist.
#[must_use]
pub fn is_volatile_key(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    VOLATILE_METADATA_KEYS.contains(&lowered.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volatile_keys_sorted_and_unique() {
        let mut sorted = VOLATILE_METADATA_KEYS.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted, VOLATILE_METADATA_KEYS);
    }

    #[test]
    fn test_is_volatile_key_case_insensitive() {
        assert!(is_volatile_key("duration_ms"));
        assert!(is_volatile_key("Duration_MS"));
        assert!(!is_volatile_key("request_id"));
        assert!(!is_volatile_key("model"));
    }

    #[test]
    fn test_duration_keys_are_volatile() {
        for key in DURATION_METADATA_KEYS {
            assert!(is_volatile_key(key));
        }
    }
}
