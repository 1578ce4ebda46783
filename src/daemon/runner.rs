//! Serialized execution of cleanup runs.
//!
//! The cron job and the HTTP trigger share one [`CleanupRunner`], so at
//! most one run is in flight per process. Runs in other processes are not
//! coordinated with.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::audit::{AuditEvent, log_audit_event};
use super::history::{HistoryStore, RunRecord};
use super::metrics;
use crate::gc::{CleanupError, CleanupReport, GarbageCollector, RunMode};

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Schedule,
    Http,
    Cli,
}

impl Trigger {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Schedule => "schedule",
            Self::Http => "http",
            Self::Cli => "cli",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("a cleanup run is already in progress")]
    Busy,

    #[error(transparent)]
    Cleanup(#[from] CleanupError),
}

/// Runs the collector, one run at a time, and records the outcome.
pub struct CleanupRunner {
    collector: GarbageCollector,
    history: Option<HistoryStore>,
    lock: Mutex<()>,
}

impl CleanupRunner {
    pub fn new(collector: GarbageCollector, history: Option<HistoryStore>) -> Self {
        Self {
            collector,
            history,
            lock: Mutex::new(()),
        }
    }

    pub fn history(&self) -> Option<&HistoryStore> {
        self.history.as_ref()
    }

    /// True while a run holds the lock.
    pub fn is_running(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    /// Runs the collector unless another run is in progress.
    ///
    /// # Errors
    ///
    /// Returns `Busy` without touching the store if a run is in flight, or
    /// the collector's fatal error.
    pub async fn run(&self, mode: RunMode, trigger: Trigger) -> Result<CleanupReport, RunError> {
        let Ok(_guard) = self.lock.try_lock() else {
            metrics::record_rejected_run(trigger);
            log_audit_event(AuditEvent::RunRejectedBusy { trigger });
            return Err(RunError::Busy);
        };

        let started = Instant::now();
        let result = self.collector.run_at(Utc::now(), mode).await;
        let elapsed = started.elapsed();

        let record = match &result {
            Ok(report) => {
                metrics::record_run(trigger, report, elapsed);
                info!(
                    trigger = trigger.as_str(),
                    run_id = %report.run_id,
                    deleted = report.deleted.len(),
                    failed = report.failed.len(),
                    "Cleanup run recorded"
                );
                RunRecord::completed(trigger, report.clone())
            },
            Err(e) => {
                metrics::record_failed_run(trigger, elapsed);
                error!(trigger = trigger.as_str(), error = %e, "Cleanup run failed");
                RunRecord::failed(trigger, e.to_string())
            },
        };

        if let Some(history) = &self.history
            && let Err(e) = history.append_async(record).await
        {
            warn!(error = %e, "Failed to persist run history");
        }

        result.map_err(RunError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gc::RetentionPolicy;
    use crate::references::MemoryReferenceSource;
    use crate::storage::{MemoryObjectStore, StoredObject};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn runner(store: &MemoryObjectStore, history: Option<HistoryStore>) -> CleanupRunner {
        let collector = GarbageCollector::new(
            Arc::new(store.clone()),
            Arc::new(MemoryReferenceSource::new()),
            RetentionPolicy::scheduled(),
        )
        .unwrap();
        CleanupRunner::new(collector, history)
    }

    #[tokio::test]
    async fn test_run_records_history() {
        let dir = tempdir().unwrap();
        let history = HistoryStore::open(dir.path().join("h.redb"), 5).unwrap();
        let store = MemoryObjectStore::new("images");
        store.insert(StoredObject::new(
            "events/old.jpg",
            Utc::now() - chrono::Duration::days(30),
        ));

        let runner = runner(&store, Some(history.clone()));
        let report = runner.run(RunMode::Delete, Trigger::Cli).await.unwrap();
        assert_eq!(report.deleted, vec!["events/old.jpg"]);

        let recent = history.recent(5).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].run_id, report.run_id);
        assert_eq!(recent[0].trigger, Trigger::Cli);
    }

    #[tokio::test]
    async fn test_failed_run_recorded() {
        let dir = tempdir().unwrap();
        let history = HistoryStore::open(dir.path().join("h.redb"), 5).unwrap();
        let store = MemoryObjectStore::new("images");
        for partition in ["events", "gallery", "sponsors"] {
            store.fail_partition(partition);
        }

        let runner = runner(&store, Some(history.clone()));
        let result = runner.run(RunMode::Delete, Trigger::Schedule).await;
        assert!(matches!(result, Err(RunError::Cleanup(_))));

        let recent = history.recent(5).unwrap();
        assert!(recent[0].report.is_none());
        assert!(recent[0].error.as_deref().unwrap().contains("unavailable"));
    }

    #[tokio::test]
    async fn test_overlapping_run_rejected() {
        let store = MemoryObjectStore::new("images");
        let runner = runner(&store, None);

        let _held = runner.lock.lock().await;
        assert!(runner.is_running());
        let result = runner.run(RunMode::DryRun, Trigger::Http).await;
        assert!(matches!(result, Err(RunError::Busy)));
        assert!(store.list_calls().is_empty());
    }
}
