//! Snapshot workflow: a name-keyed baseline store for assertions.
//!
//! One `.rpk` baseline per name in a flat snapshots directory.

use crate::assertion::{assert_runs, AssertOptions, AssertionOutcome};
use crate::error::{DiffError, DiffResult};
use replaykit_artifact::{read_artifact, write_artifact_with, WriteOptions};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use std::path::{Path, PathBuf};

/// Which snapshot operation ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotAction {
    /// Baseline was (re)written from the candidate
    Update,
    /// Candidate was asserted against the baseline
    Assert,
}

/// Terminal status of a snapshot operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    /// Baseline written
    Updated,
    /// Assertion passed
    Pass,
    /// Assertion failed
    Fail,
    /// Baseline missing or unusable
    Error,
}

/// Result of a snapshot update or assert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotOutcome {
    /// Snapshot name
    pub snapshot_name: String,
    /// Resolved baseline path
    pub baseline_path: PathBuf,
    /// Candidate artifact path
    pub candidate_path: PathBuf,
    /// Operation that ran
    pub action: SnapshotAction,
    /// Terminal status
    pub status: SnapshotStatus,
    /// Whether strict assertion rules were used
    pub strict: bool,
    /// Whether the baseline was rewritten
    pub updated: bool,
    /// Assertion outcome for assert actions
    pub assertion: Option<AssertionOutcome>,
    /// One-line human message
    pub message: String,
}

impl SnapshotOutcome {
    /// Process exit code for tools built on snapshots.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.status {
            SnapshotStatus::Updated | SnapshotStatus::Pass => 0,
            SnapshotStatus::Fail | SnapshotStatus::Error => 1,
        }
    }
}

/// Resolve the baseline path for a snapshot name.
///
/// # Errors
///
/// Rejects empty names and names containing path separators.
pub fn resolve_snapshot_baseline_path(snapshot_name: &str, snapshots_dir: &Path) -> DiffResult<PathBuf> {
    let normalized = snapshot_name.trim();
    if normalized.is_empty() {
        return Err(DiffError::SnapshotConfig {
            message: "snapshot name must be non-empty".to_string(),
        });
    }
    if normalized.contains('/') || normalized.contains('\\') {
        return Err(DiffError::SnapshotConfig {
            message: "snapshot name must not include path separators".to_string(),
        });
    }
    let file_name = if normalized.ends_with(".rpk") {
        normalized.to_string()
    } else {
        format!("{normalized}.rpk")
    };
    Ok(snapshots_dir.join(file_name))
}

/// Create or update a snapshot baseline from a candidate artifact.
///
/// # Errors
///
/// Returns an error for bad names or artifact I/O failures.
pub fn update_snapshot(
    snapshot_name: &str,
    candidate_path: &Path,
    snapshots_dir: &Path,
) -> DiffResult<SnapshotOutcome> {
    let baseline_path = resolve_snapshot_baseline_path(snapshot_name, snapshots_dir)?;
    let candidate_run = read_artifact(candidate_path)?;

    let mut metadata = Map::new();
    metadata.insert("snapshot_name".to_string(), json!(snapshot_name));
    metadata.insert("snapshot_mode".to_string(), json!("update"));
    metadata.insert(
        "snapshot_source".to_string(),
        json!(candidate_path.display().to_string()),
    );
    write_artifact_with(
        &candidate_run,
        &baseline_path,
        &WriteOptions {
            metadata,
            ..WriteOptions::default()
        },
    )?;
    tracing::info!(name = snapshot_name, baseline = %baseline_path.display(), "snapshot baseline updated");

    Ok(SnapshotOutcome {
        snapshot_name: snapshot_name.to_string(),
        baseline_path,
        candidate_path: candidate_path.to_path_buf(),
        action: SnapshotAction::Update,
        status: SnapshotStatus::Updated,
        strict: false,
        updated: true,
        assertion: None,
        message: "snapshot baseline updated".to_string(),
    })
}

/// Assert a candidate artifact against a named snapshot baseline.
///
/// # Errors
///
/// Returns an error for bad names or artifact I/O failures; a missing
/// baseline is reported as an error-status outcome, not an `Err`.
pub fn assert_snapshot(
    snapshot_name: &str,
    candidate_path: &Path,
    snapshots_dir: &Path,
    options: &AssertOptions,
) -> DiffResult<SnapshotOutcome> {
    let baseline_path = resolve_snapshot_baseline_path(snapshot_name, snapshots_dir)?;
    if !baseline_path.is_file() {
        return Ok(SnapshotOutcome {
            snapshot_name: snapshot_name.to_string(),
            baseline_path,
            candidate_path: candidate_path.to_path_buf(),
            action: SnapshotAction::Assert,
            status: SnapshotStatus::Error,
            strict: options.strict,
            updated: false,
            assertion: None,
            message: "snapshot baseline missing; run with update to create it".to_string(),
        });
    }

    let baseline_run = read_artifact(&baseline_path)?;
    let candidate_run = read_artifact(candidate_path)?;
    let assertion = assert_runs(&baseline_run, &candidate_run, options);
    let passed = assertion.passed();

    Ok(SnapshotOutcome {
        snapshot_name: snapshot_name.to_string(),
        baseline_path,
        candidate_path: candidate_path.to_path_buf(),
        action: SnapshotAction::Assert,
        status: if passed { SnapshotStatus::Pass } else { SnapshotStatus::Fail },
        strict: options.strict,
        updated: false,
        assertion: Some(assertion),
        message: if passed {
            "snapshot assertion passed".to_string()
        } else {
            "snapshot assertion failed".to_string()
        },
    })
}
