//! Run history persisted in redb.
//!
//! Each finished run (successful or not) is stored as a JSON record keyed
//! by its timestamp, so iteration order is chronological. Only the newest
//! `keep` records are retained.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use super::runner::Trigger;
use crate::gc::CleanupReport;

const RUNS_TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("cleanup_runs");

/// One entry of the run history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub trigger: Trigger,
    pub recorded_at: DateTime<Utc>,
    /// Present when the run completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<CleanupReport>,
    /// Present when the run failed before producing a report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunRecord {
    pub fn completed(trigger: Trigger, report: CleanupReport) -> Self {
        Self {
            run_id: report.run_id,
            trigger,
            recorded_at: report.finished_at,
            report: Some(report),
            error: None,
        }
    }

    pub fn failed(trigger: Trigger, error: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            trigger,
            recorded_at: Utc::now(),
            report: None,
            error: Some(error.into()),
        }
    }

    /// Sortable key: zero-padded milliseconds, then the run id.
    fn key(&self) -> String {
        format!(
            "{:020}-{}",
            self.recorded_at.timestamp_millis().max(0),
            self.run_id
        )
    }
}

/// Bounded, persistent list of recent runs.
#[derive(Clone)]
pub struct HistoryStore {
    db: Arc<Database>,
    keep: usize,
}

impl HistoryStore {
    /// Opens or creates the history database.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// database cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P, keep: usize) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create history directory: {}", parent.display())
            })?;
        }

        let db = Database::create(path)
            .with_context(|| format!("Failed to open history database: {}", path.display()))?;

        let write_txn = db
            .begin_write()
            .context("Failed to begin initialization transaction")?;
        {
            let _table = write_txn
                .open_table(RUNS_TABLE)
                .context("Failed to initialize history table")?;
        }
        write_txn
            .commit()
            .context("Failed to commit initialization transaction")?;

        Ok(Self {
            db: Arc::new(db),
            keep: keep.max(1),
        })
    }

    /// Stores a record and drops the oldest ones beyond `keep`.
    pub fn append(&self, record: &RunRecord) -> Result<()> {
        let json = serde_json::to_vec(record).context("Failed to serialize run record")?;
        let key = record.key();

        let write_txn = self
            .db
            .begin_write()
            .context("Failed to begin write transaction")?;
        {
            let mut table = write_txn
                .open_table(RUNS_TABLE)
                .context("Failed to open history table")?;

            table
                .insert(key.as_str(), json.as_slice())
                .with_context(|| format!("Failed to insert run '{}'", record.run_id))?;

            let len = usize::try_from(table.len().context("Failed to count history")?)
                .unwrap_or(usize::MAX);
            if len > self.keep {
                let expired: Vec<String> = table
                    .iter()
                    .context("Failed to iterate history table")?
                    .take(len - self.keep)
                    .filter_map(|item| item.ok().map(|(k, _)| k.value().to_string()))
                    .collect();
                for key in expired {
                    table
                        .remove(key.as_str())
                        .with_context(|| format!("Failed to prune run '{key}'"))?;
                }
            }
        }
        write_txn
            .commit()
            .context("Failed to commit history transaction")?;

        Ok(())
    }

    /// Returns up to `limit` records, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let read_txn = self
            .db
            .begin_read()
            .context("Failed to begin read transaction")?;

        let table = read_txn
            .open_table(RUNS_TABLE)
            .context("Failed to open history table")?;

        let mut records = Vec::new();
        for item in table
            .iter()
            .context("Failed to iterate history table")?
            .rev()
            .take(limit)
        {
            let (key, value) = item.context("Failed to read history entry")?;
            match serde_json::from_slice::<RunRecord>(value.value()) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(key = key.value(), error = %e, "Skipping unreadable run record");
                },
            }
        }

        Ok(records)
    }

    /// Stores a record asynchronously.
    pub async fn append_async(&self, record: RunRecord) -> Result<()> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.append(&record))
            .await
            .context("Task join error")?
    }

    /// Lists recent records asynchronously.
    pub async fn recent_async(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.recent(limit))
            .await
            .context("Task join error")?
    }
}
