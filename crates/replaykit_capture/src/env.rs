//! Default environment and runtime descriptors for new runs.

use serde_json::{Map, Value};

/// Current UTC time in the artifact timestamp form.
#[must_use]
pub fn utc_now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Host description recorded on new runs: `os`, `arch`, `cwd`.
#[must_use]
pub fn default_environment_fingerprint() -> Map<String, Value> {
    let mut fingerprint = Map::new();
    fingerprint.insert("os".to_string(), Value::String(std::env::consts::OS.to_string()));
    fingerprint.insert("arch".to_string(), Value::String(std::env::consts::ARCH.to_string()));
    let cwd = std::env::current_dir()
        .map(|dir| dir.display().to_string())
        .unwrap_or_default();
    fingerprint.insert("cwd".to_string(), Value::String(cwd));
    fingerprint
}

/// Toolchain description recorded on new runs.
#[must_use]
pub fn default_runtime_versions() -> Map<String, Value> {
    let mut versions = Map::new();
    versions.insert(
        "replaykit".to_string(),
        Value::String(env!("CARGO_PKG_VERSION").to_string()),
    );
    versions
}
