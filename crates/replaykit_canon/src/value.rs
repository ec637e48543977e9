//! Value canonicalization rules.
//!
//! Applied recursively: mapping keys sort by code point, arrays preserve
//! order (except unordered-collection fields), strings normalize newlines
//! plus context-dependent path and timestamp forms.

use crate::volatile::{REQUEST_ID_VOLATILE_MARKER, UNORDERED_LIST_KEYS, VOLATILE_METADATA_KEYS};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Options controlling canonicalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CanonOptions {
    /// Strip volatile metadata keys at all depths
    pub strip_volatile: bool,
}

/// Mapping keys whose string values are treated as filesystem paths.
const PATH_FIELD_HINTS: &[&str] = &[
    "cwd",
    "dir",
    "directory",
    "file",
    "file_path",
    "filepath",
    "path",
    "working_directory",
];

/// Mapping keys whose string values are treated as timestamps.
const TIMESTAMP_FIELD_HINTS: &[&str] = &[
    "captured_at",
    "created_at",
    "ended_at",
    "started_at",
    "timestamp",
    "updated_at",
];

/// Canonicalize a value with default options.
#[must_use]
pub fn canonicalize(value: &Value) -> Value {
    canonicalize_with(value, &CanonOptions::default())
}

/// Canonicalize a value, optionally stripping volatile keys.
#[must_use]
pub fn canonicalize_with(value: &Value, options: &CanonOptions) -> Value {
    canonicalize_at(value, None, options)
}

fn canonicalize_at(value: &Value, key: Option<&str>, options: &CanonOptions) -> Value {
    match value {
        Value::Object(map) => {
            let strip_request_id = options.strip_volatile
                && map
                    .get(REQUEST_ID_VOLATILE_MARKER)
                    .and_then(Value::as_bool)
                    .unwrap_or(false);

            let mut normalized = Map::new();
            for (raw_key, child) in map {
                let lowered = raw_key.to_ascii_lowercase();
                if options.strip_volatile {
                    if VOLATILE_METADATA_KEYS.contains(&lowered.as_str()) {
                        continue;
                    }
                    if strip_request_id
                        && (lowered == "request_id" || lowered == REQUEST_ID_VOLATILE_MARKER)
                    {
                        continue;
                    }
                }
                normalized.insert(raw_key.clone(), canonicalize_at(child, Some(&lowered), options));
            }
            Value::Object(normalized)
        }
        Value::Array(items) => {
            let mut normalized: Vec<Value> = items
                .iter()
                .map(|item| canonicalize_at(item, None, options))
                .collect();
            if key.is_some_and(|k| UNORDERED_LIST_KEYS.contains(&k)) {
                normalized.sort_by_cached_key(|item| {
                    serde_json::to_string(item).unwrap_or_default()
                });
            }
            Value::Array(normalized)
        }
        Value::String(text) => Value::String(normalize_string(text, key)),
        _ => value.clone(),
    }
}

fn normalize_string(value: &str, key: Option<&str>) -> String {
    let text = value.replace("\r\n", "\n").replace('\r', "\n");
    if let Some(k) = key {
        if is_path_field(k) {
            return normalize_path(&text);
        }
        if TIMESTAMP_FIELD_HINTS.contains(&k) {
            return normalize_timestamp(&text);
        }
    }
    text
}

fn is_path_field(key: &str) -> bool {
    PATH_FIELD_HINTS.contains(&key) || key.ends_with("_path") || key.ends_with("_dir")
}

fn normalize_path(value: &str) -> String {
    let mut candidate = value.replace('\\', "/");

    // Windows drive prefix: C:/x -> /c/x
    let bytes = candidate.as_bytes();
    if bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/' {
        let drive = bytes[0].to_ascii_lowercase() as char;
        candidate = format!("/{}/{}", drive, &candidate[3..]);
    }

    lexical_normpath(&candidate)
}

/// Lexical POSIX path normalization: collapse separators, resolve `.` and
/// `..` without touching the filesystem. Never emits a trailing `/` except
/// for root.
fn lexical_normpath(input: &str) -> String {
    let absolute = input.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in input.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

fn normalize_timestamp(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }
    match DateTime::parse_from_rfc3339(trimmed) {
        Ok(parsed) => parsed
            .with_timezone(&Utc)
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string(),
        Err(_) => trimmed.to_string(),
    }
}
