//! Retention policy configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    DEFAULT_DELETE_BATCH_SIZE, DEFAULT_PAGE_SIZE, DEFAULT_PARTITIONS, DEFAULT_REFERENCE_SOURCES,
    LIBRARY_GRACE_PERIOD_HOURS, PLACEHOLDER_MARKER, SCHEDULED_GRACE_PERIOD_HOURS,
};
use crate::references::ReferenceSourceSpec;

/// What to do when a reference query fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceFailureMode {
    /// Abort the run before deleting anything.
    Abort,
    /// Treat the failed source as holding no references and continue.
    ///
    /// A transient query failure then makes live objects look orphaned.
    #[default]
    Degrade,
}

/// Retention policy for the image garbage collector.
///
/// Controls which partitions are scanned, where live references are read
/// from, and how old an object must be before it may be deleted.
///
/// The grace period is the only protection for an object whose upload
/// finished but whose referencing row has not been committed yet, so it
/// should be a day or more in production.
///
/// # Example
///
/// ```rust
/// use asset_gc::gc::RetentionPolicy;
/// use std::time::Duration;
///
/// // The nightly job
/// let policy = RetentionPolicy::scheduled();
/// assert_eq!(policy.grace_period, Duration::from_secs(7 * 24 * 3600));
///
/// // Or customize
/// let policy = RetentionPolicy::scheduled()
///     .with_grace_period(Duration::from_secs(48 * 3600))
///     .with_partitions(["gallery"]);
/// assert_eq!(policy.partitions, vec!["gallery".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Partitions to scan, in order. An empty name is the bucket root.
    pub partitions: Vec<String>,
    /// Objects younger than this are always preserved.
    pub grace_period: Duration,
    /// Columns whose values reference stored objects.
    pub reference_sources: Vec<ReferenceSourceSpec>,
    /// Reserved file name that is never deleted.
    pub placeholder_marker: String,
    /// Listing page size.
    pub page_size: u32,
    /// Paths per delete request.
    pub delete_batch_size: usize,
    /// Behaviour when a reference query fails.
    pub on_reference_failure: ReferenceFailureMode,
    /// Optional bound on the whole run.
    pub deadline: Option<Duration>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::scheduled()
    }
}

impl RetentionPolicy {
    /// The nightly job: 7 day grace period over the named partitions.
    #[must_use]
    pub fn scheduled() -> Self {
        Self {
            partitions: DEFAULT_PARTITIONS.iter().map(ToString::to_string).collect(),
            grace_period: Duration::from_secs(SCHEDULED_GRACE_PERIOD_HOURS * 3600),
            reference_sources: DEFAULT_REFERENCE_SOURCES
                .iter()
                .map(|(table, column)| ReferenceSourceSpec::new(*table, *column))
                .collect(),
            placeholder_marker: PLACEHOLDER_MARKER.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            delete_batch_size: DEFAULT_DELETE_BATCH_SIZE,
            on_reference_failure: ReferenceFailureMode::Degrade,
            deadline: None,
        }
    }

    /// The on-demand helper: 24 hour grace period over the bucket root.
    #[must_use]
    pub fn library() -> Self {
        Self {
            partitions: vec![String::new()],
            grace_period: Duration::from_secs(LIBRARY_GRACE_PERIOD_HOURS * 3600),
            ..Self::scheduled()
        }
    }

    #[must_use]
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    #[must_use]
    pub fn with_partitions<I, S>(mut self, partitions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partitions = partitions.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_reference_sources(mut self, sources: Vec<ReferenceSourceSpec>) -> Self {
        self.reference_sources = sources;
        self
    }

    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub const fn with_delete_batch_size(mut self, size: usize) -> Self {
        self.delete_batch_size = size;
        self
    }

    #[must_use]
    pub const fn with_reference_failure_mode(mut self, mode: ReferenceFailureMode) -> Self {
        self.on_reference_failure = mode;
        self
    }

    #[must_use]
    pub const fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Returns true if `path` names a configured partition.
    #[must_use]
    pub fn is_partition_name(&self, path: &str) -> bool {
        let trimmed = path.trim_end_matches('/');
        self.partitions
            .iter()
            .any(|partition| !partition.is_empty() && partition.trim_end_matches('/') == trimmed)
    }

    /// Returns true if the last segment of `path` is the placeholder marker.
    #[must_use]
    pub fn is_placeholder(&self, path: &str) -> bool {
        path.rsplit('/').next() == Some(self.placeholder_marker.as_str())
    }

    /// Validates the policy settings are usable.
    ///
    /// Returns an error message if validation fails.
    #[must_use]
    pub fn validate(&self) -> Option<String> {
        if self.partitions.is_empty() {
            return Some("at least one partition is required".to_string());
        }
        if self.reference_sources.is_empty() {
            // Without references every old object would look orphaned
            return Some("at least one reference source is required".to_string());
        }
        for source in &self.reference_sources {
            if let Err(e) = source.validate() {
                return Some(format!("reference source {source}: {e}"));
            }
        }
        if self.placeholder_marker.is_empty() {
            return Some("placeholder_marker cannot be empty".to_string());
        }
        if self.page_size == 0 {
            return Some("page_size must be at least 1".to_string());
        }
        if self.delete_batch_size == 0 {
            return Some("delete_batch_size must be at least 1".to_string());
        }
        if self.deadline.is_some_and(|d| d.is_zero()) {
            return Some("deadline must be positive when set".to_string());
        }
        None
    }
}
