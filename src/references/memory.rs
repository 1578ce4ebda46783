//! In-memory reference source.

use super::backend::ReferenceSource;
use super::types::{ReferenceError, ReferenceRow, validate_identifier};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::sync::Arc;

/// Column values keyed by `(table, column)`.
///
/// Clones share state. Columns can be made to fail to simulate a broken
/// query against one table.
#[derive(Clone, Default)]
pub struct MemoryReferenceSource {
    columns: Arc<DashMap<(String, String), Vec<Option<String>>>>,
    failing: Arc<DashSet<(String, String)>>,
}

impl MemoryReferenceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a row holding `value` in `table.column`.
    pub fn insert(&self, table: &str, column: &str, value: impl Into<String>) {
        self.push(table, column, Some(value.into()));
    }

    /// Adds a row whose `table.column` is NULL.
    pub fn insert_null(&self, table: &str, column: &str) {
        self.push(table, column, None);
    }

    /// Makes every query of `table.column` fail.
    pub fn fail_source(&self, table: &str, column: &str) {
        self.failing.insert((table.to_string(), column.to_string()));
    }

    fn push(&self, table: &str, column: &str, value: Option<String>) {
        self.columns
            .entry((table.to_string(), column.to_string()))
            .or_default()
            .push(value);
    }
}

#[async_trait]
impl ReferenceSource for MemoryReferenceSource {
    async fn select_non_null(
        &self,
        table: &str,
        column: &str,
    ) -> Result<Vec<ReferenceRow>, ReferenceError> {
        validate_identifier(table)?;
        validate_identifier(column)?;

        let key = (table.to_string(), column.to_string());
        if self.failing.contains(&key) {
            return Err(ReferenceError::Unavailable(format!(
                "query on {table}.{column} failed"
            )));
        }

        Ok(self
            .columns
            .get(&key)
            .map(|values| {
                values
                    .iter()
                    .flatten()
                    .map(|value| ReferenceRow::new(value.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_select_skips_nulls() {
        let source = MemoryReferenceSource::new();
        source.insert("events", "image_url", "https://x/images/events/a.jpg");
        source.insert_null("events", "image_url");

        let rows = source.select_non_null("events", "image_url").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].value.is_some());
    }

    #[tokio::test]
    async fn test_unknown_column_is_empty() {
        let source = MemoryReferenceSource::new();
        let rows = source.select_non_null("photos", "image_url").await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_failing_source() {
        let source = MemoryReferenceSource::new();
        source.fail_source("photos", "image_url");
        let result = source.select_non_null("photos", "image_url").await;
        assert!(matches!(result, Err(ReferenceError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_rejects_bad_identifier() {
        let source = MemoryReferenceSource::new();
        let result = source.select_non_null("events; drop", "image_url").await;
        assert!(matches!(result, Err(ReferenceError::InvalidIdentifier(_))));
    }
}
