//! Cleanup run reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why an enumerated object was kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exclusion {
    /// Reserved placeholder marker.
    Placeholder,
    /// Younger than the grace period.
    WithinGracePeriod,
    /// Listed without a creation timestamp (folder-like entry).
    Undated,
    /// Path equals a configured partition name.
    PartitionEntry,
    /// Referenced by a tracked row.
    Referenced,
}

/// Number of objects kept, per reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionCounts {
    pub placeholder: usize,
    pub within_grace_period: usize,
    pub undated: usize,
    pub partition_entry: usize,
    pub referenced: usize,
}

impl ExclusionCounts {
    pub fn record(&mut self, reason: Exclusion) {
        match reason {
            Exclusion::Placeholder => self.placeholder += 1,
            Exclusion::WithinGracePeriod => self.within_grace_period += 1,
            Exclusion::Undated => self.undated += 1,
            Exclusion::PartitionEntry => self.partition_entry += 1,
            Exclusion::Referenced => self.referenced += 1,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.placeholder
            + self.within_grace_period
            + self.undated
            + self.partition_entry
            + self.referenced
    }
}

/// A candidate the store failed to delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteFailure {
    pub path: String,
    pub error: String,
}

/// Result of one cleanup run.
///
/// Produced by both real and dry runs; a dry run lists candidates but
/// never fills `deleted`, `already_gone` or `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    /// Objects enumerated across all partitions.
    pub objects_scanned: usize,
    /// Distinct referenced paths found.
    pub references_found: usize,
    /// Stored values that did not point into the bucket.
    pub malformed_references: usize,
    pub excluded: ExclusionCounts,
    /// Paths eligible for deletion.
    pub candidates: Vec<String>,
    pub deleted: Vec<String>,
    /// Candidates another run removed first.
    pub already_gone: Vec<String>,
    pub failed: Vec<DeleteFailure>,
    /// Candidates not attempted because the deadline passed.
    pub skipped: Vec<String>,
    /// Recovered errors (failed partition listings, degraded sources).
    pub warnings: Vec<String>,
    pub deadline_exceeded: bool,
}

impl CleanupReport {
    pub(crate) fn begin(started_at: DateTime<Utc>, dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: started_at,
            dry_run,
            objects_scanned: 0,
            references_found: 0,
            malformed_references: 0,
            excluded: ExclusionCounts::default(),
            candidates: Vec::new(),
            deleted: Vec::new(),
            already_gone: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            warnings: Vec::new(),
            deadline_exceeded: false,
        }
    }

    /// True when nothing went wrong: no warnings, failures or skips.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
            && self.failed.is_empty()
            && self.skipped.is_empty()
            && !self.deadline_exceeded
    }

    /// One-line summary for logs and the CLI.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "scanned {} objects, {} referenced paths, {} candidates, {} deleted, {} already gone, {} failed, {} skipped",
            self.objects_scanned,
            self.references_found,
            self.candidates.len(),
            self.deleted.len(),
            self.already_gone.len(),
            self.failed.len(),
            self.skipped.len(),
        )
    }
}
