//! Canonical JSON emission.
//!
//! Compact form (no insignificant whitespace) feeds hashing; the pretty
//! form is the on-disk artifact layout. Both are deterministic: keys are
//! sorted, floats use the shortest round-trip form.

use crate::error::{CanonError, CanonResult};
use crate::value::{canonicalize_with, CanonOptions};
use serde_json::Value;

/// Serialize a value to compact canonical JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn canonical_json(value: &Value) -> CanonResult<String> {
    canonical_json_with(value, &CanonOptions::default())
}

/// Serialize a value to compact canonical JSON with explicit options.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn canonical_json_with(value: &Value, options: &CanonOptions) -> CanonResult<String> {
    let canonical = canonicalize_with(value, options);
    serde_json::to_string(&canonical).map_err(|err| CanonError::Serialize {
        message: err.to_string(),
    })
}

/// Serialize a value to the on-disk artifact form: canonicalized,
/// 2-space indented, sorted keys, trailing newline.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn canonical_json_pretty(value: &Value) -> CanonResult<String> {
    let canonical = canonicalize_with(value, &CanonOptions::default());
    let rendered = serde_json::to_string_pretty(&canonical).map_err(|err| CanonError::Serialize {
        message: err.to_string(),
    })?;
    Ok(format!("{rendered}\n"))
}

/// Build a canonical number value from a float.
///
/// # Errors
///
/// Rejects NaN and infinity, which have no canonical representation.
pub fn number_from_f64(value: f64) -> CanonResult<Value> {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .ok_or(CanonError::NonFiniteNumber)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compact_output_sorted_keys() {
        let value = json!({"zeta": 1, "alpha": {"b": 2, "a": 1}});
        let rendered = canonical_json(&value).unwrap();
        assert_eq!(rendered, r#"{"alpha":{"a":1,"b":2},"zeta":1}"#);
    }

    #[test]
    fn test_integers_without_decimal_point() {
        let value = json!({"count": 3, "ratio": 0.5});
        let rendered = canonical_json(&value).unwrap();
        assert_eq!(rendered, r#"{"count":3,"ratio":0.5}"#);
    }

    #[test]
    fn test_pretty_output_trailing_newline() {
        let value = json!({"a": 1});
        let rendered = canonical_json_pretty(&value).unwrap();
        assert!(rendered.ends_with('\n'));
        assert!(rendered.starts_with("{\n"));
    }

    #[test]
    fn test_number_from_f64_rejects_non_finite() {
        assert!(number_from_f64(f64::NAN).is_err());
        assert!(number_from_f64(f64::INFINITY).is_err());
        assert!(number_from_f64(f64::NEG_INFINITY).is_err());
        assert!(number_from_f64(0.25).is_ok());
    }

    #[test]
    fn test_deterministic_output() {
        let value = json!({"b": [1, 2, {"y": true, "x": null}], "a": "text"});
        assert_eq!(
            canonical_json(&value).unwrap(),
            canonical_json(&value).unwrap()
        );
    }

    // Property tests using proptest
    use proptest::prelude::*;

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| Value::Number(n.into())),
            "[a-zA-Z0-9 /._:-]{0,16}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                proptest::collection::btree_map("[a-z_]{1,8}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest::proptest! {
        #[test]
        fn prop_canonicalize_fixed_point(value in arb_value()) {
            let once = crate::value::canonicalize(&value);
            let twice = crate::value::canonicalize(&once);
            prop_assert_eq!(&once, &twice);
        }

        #[test]
        fn prop_canonical_json_parse_roundtrip(value in arb_value()) {
            let rendered = canonical_json(&value).unwrap();
            let parsed: Value = serde_json::from_str(&rendered).unwrap();
            prop_assert_eq!(canonical_json(&parsed).unwrap(), rendered);
        }

        #[test]
        fn prop_canonical_json_deterministic(value in arb_value()) {
            prop_assert_eq!(
                canonical_json(&value).unwrap(),
                canonical_json(&value).unwrap()
            );
        }
    }
}
