//! In-memory object store.
//!
//! Provides a fast, non-persistent store using DashMap for concurrent
//! access. Used as the test double for the collector and for local
//! experiments; supports failure injection per partition and per path.

use super::backend::ObjectStore;
use super::types::{DeleteOutcome, DeleteResult, PageRequest, StoredObject, StoreError};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use std::sync::Arc;

/// In-memory object store using DashMap.
///
/// All data is lost when the process exits. Listing follows the hosted
/// store's semantics: only objects directly under the partition are
/// returned, oldest first, in `limit`/`offset` pages.
///
/// # Thread Safety
///
/// `MemoryObjectStore` is `Clone`; clones share the same underlying
/// state, so a test can keep a handle while the collector owns another.
///
/// # Example
///
/// ```ignore
/// use asset_gc::storage::{MemoryObjectStore, StoredObject};
///
/// let store = MemoryObjectStore::new("images");
/// store.insert(StoredObject::new("events/banner.jpg", Utc::now()));
/// ```
#[derive(Clone)]
pub struct MemoryObjectStore {
    bucket: String,
    objects: Arc<DashMap<String, StoredObject>>,
    failing_partitions: Arc<DashSet<String>>,
    failing_paths: Arc<DashSet<String>>,
    delete_log: Arc<Mutex<Vec<String>>>,
    list_calls: Arc<Mutex<Vec<(String, PageRequest)>>>,
}

impl MemoryObjectStore {
    /// Creates a new empty store for `bucket`.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Arc::default(),
            failing_partitions: Arc::default(),
            failing_paths: Arc::default(),
            delete_log: Arc::default(),
            list_calls: Arc::default(),
        }
    }

    /// Inserts or replaces an object.
    pub fn insert(&self, object: StoredObject) {
        self.objects.insert(object.path.clone(), object);
    }

    /// Returns true if an object exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.objects.contains_key(path)
    }

    /// Returns the number of objects in the store.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Makes every listing of `partition` fail.
    pub fn fail_partition(&self, partition: impl Into<String>) {
        self.failing_partitions.insert(partition.into());
    }

    /// Makes deletion of `path` fail while leaving the object in place.
    pub fn fail_delete(&self, path: impl Into<String>) {
        self.failing_paths.insert(path.into());
    }

    /// Every path passed to `delete_objects`, in call order.
    pub fn delete_log(&self) -> Vec<String> {
        self.delete_log.lock().clone()
    }

    /// Every listing request received, in call order.
    pub fn list_calls(&self) -> Vec<(String, PageRequest)> {
        self.list_calls.lock().clone()
    }

    fn is_direct_child(partition: &str, path: &str) -> bool {
        if partition.is_empty() {
            return !path.contains('/');
        }
        path.strip_prefix(partition)
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|name| !name.is_empty() && !name.contains('/'))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_page(
        &self,
        partition: &str,
        page: PageRequest,
    ) -> Result<Vec<StoredObject>, StoreError> {
        self.list_calls.lock().push((partition.to_string(), page));

        if self.failing_partitions.contains(partition) {
            return Err(StoreError::Unavailable(format!(
                "listing of '{partition}' failed"
            )));
        }

        let mut objects: Vec<StoredObject> = self
            .objects
            .iter()
            .filter(|entry| Self::is_direct_child(partition, entry.key()))
            .map(|entry| entry.value().clone())
            .collect();

        // Oldest first, undated entries (folders) first, path as tie-breaker
        objects.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.path.cmp(&b.path))
        });

        Ok(objects
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn delete_objects(&self, paths: &[String]) -> Result<Vec<DeleteResult>, StoreError> {
        self.delete_log.lock().extend(paths.iter().cloned());

        Ok(paths
            .iter()
            .map(|path| {
                let outcome = if self.failing_paths.contains(path) {
                    DeleteOutcome::Failed("permission denied".to_string())
                } else if self.objects.remove(path).is_some() {
                    DeleteOutcome::Deleted
                } else {
                    DeleteOutcome::AlreadyGone
                };
                DeleteResult::new(path.clone(), outcome)
            })
            .collect())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "https://memory.invalid/storage/v1/object/public/{}/{path}",
            self.bucket
        )
    }
}
