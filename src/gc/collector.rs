//! Garbage collector implementation.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::error::{CleanupError, Result};
use super::policy::{ReferenceFailureMode, RetentionPolicy};
use super::reference::ReferenceSet;
use super::report::{CleanupReport, DeleteFailure, Exclusion};
use crate::constants::MAX_PAGES_PER_PARTITION;
use crate::references::ReferenceSource;
use crate::storage::{DeleteOutcome, ObjectStore, PageRequest, StoreError, StoredObject};

/// Decides whether an object must be kept.
///
/// Returns the first matching exclusion, or `None` when the object is a
/// deletion candidate. Checks run in this order: placeholder marker,
/// missing timestamp, grace period, partition name, live reference.
pub fn classify(
    object: &StoredObject,
    now: DateTime<Utc>,
    policy: &RetentionPolicy,
    references: &ReferenceSet,
) -> Option<Exclusion> {
    if policy.is_placeholder(&object.path) {
        return Some(Exclusion::Placeholder);
    }

    match object.age(now) {
        None => return Some(Exclusion::Undated),
        // Negative ages (store clock ahead) fail to_std and count as recent
        Some(age) => match age.to_std() {
            Ok(age) if age >= policy.grace_period => {},
            _ => return Some(Exclusion::WithinGracePeriod),
        },
    }

    if policy.is_partition_name(&object.path) {
        return Some(Exclusion::PartitionEntry);
    }

    if references.contains(&object.path) {
        return Some(Exclusion::Referenced);
    }

    None
}

/// Whether phase four deletes or only reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Delete,
    DryRun,
}

/// Garbage collector for unreferenced images.
///
/// Runs four phases, each fully completed before the next starts:
///
/// 1. Enumerate every object in the configured partitions (concurrently,
///    paging until a short page).
/// 2. Collect referenced paths from every reference source (concurrently).
/// 3. Classify each object with [`classify`].
/// 4. Delete the remaining candidates in batches.
///
/// Each run is stateless: an immediate second run deletes nothing.
///
/// # Example
///
/// ```rust,ignore
/// let collector = GarbageCollector::new(store, references, RetentionPolicy::scheduled())?;
///
/// // Dry run first
/// let preview = collector.dry_run().await?;
///
/// // Actually collect
/// let report = collector.run().await?;
/// ```
pub struct GarbageCollector {
    store: Arc<dyn ObjectStore>,
    references: Arc<dyn ReferenceSource>,
    policy: RetentionPolicy,
}

impl GarbageCollector {
    /// Creates a new garbage collector.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPolicy` if the policy fails validation.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        references: Arc<dyn ReferenceSource>,
        policy: RetentionPolicy,
    ) -> Result<Self> {
        if let Some(problem) = policy.validate() {
            return Err(CleanupError::InvalidPolicy(problem));
        }
        Ok(Self {
            store,
            references,
            policy,
        })
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Runs garbage collection, deleting unreferenced objects.
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal conditions; recovered failures are
    /// listed in the report's `warnings` and `failed` fields.
    pub async fn run(&self) -> Result<CleanupReport> {
        self.run_at(Utc::now(), RunMode::Delete).await
    }

    /// Runs phases one to three and reports what would be deleted.
    ///
    /// # Errors
    ///
    /// Same fatal conditions as [`GarbageCollector::run`].
    pub async fn dry_run(&self) -> Result<CleanupReport> {
        self.run_at(Utc::now(), RunMode::DryRun).await
    }

    /// Runs with an explicit clock.
    ///
    /// # Errors
    ///
    /// Same fatal conditions as [`GarbageCollector::run`].
    pub async fn run_at(&self, now: DateTime<Utc>, mode: RunMode) -> Result<CleanupReport> {
        let started = Instant::now();
        let deadline = self.policy.deadline.map(|d| started + d);
        let mut report = CleanupReport::begin(now, mode == RunMode::DryRun);

        info!(
            run_id = %report.run_id,
            bucket = %self.store.bucket(),
            partitions = ?self.policy.partitions,
            grace_period_secs = self.policy.grace_period.as_secs(),
            dry_run = report.dry_run,
            "Starting cleanup run"
        );

        let objects = self
            .within_deadline(deadline, "enumeration", self.enumerate(&mut report))
            .await??;
        report.objects_scanned = objects.len();

        let references = self
            .within_deadline(
                deadline,
                "reference collection",
                self.collect_references(&mut report),
            )
            .await??;
        report.references_found = references.len();
        report.malformed_references = references.malformed();
        if references.malformed() > 0 {
            debug!(
                malformed = references.malformed(),
                "Skipped stored URLs outside the bucket"
            );
        }

        for object in &objects {
            match classify(object, now, &self.policy, &references) {
                Some(reason) => report.excluded.record(reason),
                None => report.candidates.push(object.path.clone()),
            }
        }

        debug!(
            candidates = report.candidates.len(),
            excluded = report.excluded.total(),
            "Classified objects"
        );

        if mode == RunMode::Delete {
            self.delete_candidates(&mut report, deadline).await;
        }

        report.finished_at = now
            + chrono::Duration::from_std(started.elapsed()).unwrap_or_else(|_| chrono::Duration::zero());

        info!(
            run_id = %report.run_id,
            duration_ms = started.elapsed().as_millis() as u64,
            clean = report.is_clean(),
            "Cleanup run finished: {}",
            report.summary()
        );

        Ok(report)
    }

    async fn within_deadline<T>(
        &self,
        deadline: Option<Instant>,
        phase: &'static str,
        future: impl std::future::Future<Output = T>,
    ) -> Result<T> {
        match deadline {
            None => Ok(future.await),
            Some(at) => tokio::time::timeout_at(at, future).await.map_err(|_| {
                warn!(phase, "Cleanup deadline exceeded, nothing deleted");
                CleanupError::DeadlineExceeded {
                    deadline: self.policy.deadline.unwrap_or(Duration::ZERO),
                    phase,
                }
            }),
        }
    }

    /// Phase 1: list every partition, tolerating individual failures.
    async fn enumerate(&self, report: &mut CleanupReport) -> Result<Vec<StoredObject>> {
        let listings = join_all(
            self.policy
                .partitions
                .iter()
                .map(|partition| self.list_partition(partition)),
        )
        .await;

        let mut objects = Vec::new();
        let mut failures = Vec::new();

        for (partition, listing) in self.policy.partitions.iter().zip(listings) {
            match listing {
                Ok(found) => {
                    debug!(partition = %partition, objects = found.len(), "Listed partition");
                    objects.extend(found);
                },
                Err(StoreError::Unauthorized(msg)) => {
                    return Err(CleanupError::StoreUnavailable(msg));
                },
                Err(e) => {
                    warn!(partition = %partition, error = %e, "Listing failed, partition skipped");
                    report
                        .warnings
                        .push(format!("listing partition '{partition}' failed: {e}"));
                    failures.push(e.to_string());
                },
            }
        }

        if failures.len() == self.policy.partitions.len() {
            return Err(CleanupError::StoreUnavailable(format!(
                "every partition listing failed: {}",
                failures.join("; ")
            )));
        }

        Ok(objects)
    }

    async fn list_partition(
        &self,
        partition: &str,
    ) -> std::result::Result<Vec<StoredObject>, StoreError> {
        let limit = self.policy.page_size;
        let mut objects = Vec::new();
        let mut offset = 0u32;

        for _ in 0..MAX_PAGES_PER_PARTITION {
            let page = self
                .store
                .list_page(partition, PageRequest { limit, offset })
                .await?;
            let count = page.len();
            objects.extend(page);

            if count < limit as usize {
                return Ok(objects);
            }
            offset = match offset.checked_add(limit) {
                Some(next) => next,
                None => break,
            };
        }

        Err(StoreError::InvalidResponse(format!(
            "listing of '{partition}' did not stop paging"
        )))
    }

    /// Phase 2: gather referenced paths from every source.
    async fn collect_references(&self, report: &mut CleanupReport) -> Result<ReferenceSet> {
        let sources = &self.policy.reference_sources;
        let results = join_all(
            sources
                .iter()
                .map(|source| self.references.select_non_null(&source.table, &source.column)),
        )
        .await;

        let bucket = self.store.bucket();
        let mut set = ReferenceSet::new();

        for (source, result) in sources.iter().zip(results) {
            match result {
                Ok(rows) => {
                    debug!(source = %source, rows = rows.len(), "Collected references");
                    for url in rows.iter().filter_map(|row| row.value.as_deref()) {
                        set.add_url(url, bucket);
                    }
                },
                Err(error) => match self.policy.on_reference_failure {
                    ReferenceFailureMode::Abort => {
                        warn!(source = %source, error = %error, "Reference query failed, aborting run");
                        return Err(CleanupError::ReferenceQueryFailed {
                            source_name: source.to_string(),
                            error,
                        });
                    },
                    ReferenceFailureMode::Degrade => {
                        warn!(
                            source = %source,
                            error = %error,
                            "Reference query failed, continuing without its references"
                        );
                        report
                            .warnings
                            .push(format!("reference query on {source} failed: {error}"));
                    },
                },
            }
        }

        Ok(set)
    }

    /// Phase 4: delete candidates batch by batch.
    ///
    /// The deadline is checked between batches; a batch in flight is never
    /// abandoned, since its outcome would be unknown.
    async fn delete_candidates(&self, report: &mut CleanupReport, deadline: Option<Instant>) {
        let batch_size = self.policy.delete_batch_size;
        let candidates = report.candidates.clone();

        for (index, batch) in candidates.chunks(batch_size).enumerate() {
            if deadline.is_some_and(|at| Instant::now() >= at) {
                let remaining = &candidates[index * batch_size..];
                warn!(
                    skipped = remaining.len(),
                    "Cleanup deadline exceeded, skipping remaining candidates"
                );
                report.skipped.extend(remaining.iter().cloned());
                report.deadline_exceeded = true;
                return;
            }

            match self.store.delete_objects(batch).await {
                Ok(results) => {
                    for result in results {
                        match result.outcome {
                            DeleteOutcome::Deleted => {
                                debug!(path = %result.path, "Deleted unreferenced object");
                                report.deleted.push(result.path);
                            },
                            DeleteOutcome::AlreadyGone => {
                                debug!(path = %result.path, "Object already gone");
                                report.already_gone.push(result.path);
                            },
                            DeleteOutcome::Failed(error) => {
                                warn!(path = %result.path, error = %error, "Delete failed");
                                report.failed.push(DeleteFailure {
                                    path: result.path,
                                    error,
                                });
                            },
                        }
                    }
                },
                Err(e) => {
                    warn!(batch = batch.len(), error = %e, "Delete request failed");
                    report.failed.extend(batch.iter().map(|path| DeleteFailure {
                        path: path.clone(),
                        error: e.to_string(),
                    }));
                },
            }
        }
    }
}
