//! Backend trait for the object store.
//!
//! Defines the interface the garbage collector drives, enabling
//! pluggable stores (hosted REST API, in-memory test double, etc.).

use super::types::{DeleteResult, PageRequest, StoredObject, StoreError};
use async_trait::async_trait;

/// Backend trait for a bucket in a hosted object store.
///
/// All backends must be thread-safe (`Send + Sync`) for use with tokio.
/// The collector only ever lists and deletes; it never writes objects.
///
/// # Example
///
/// ```ignore
/// use asset_gc::storage::{MemoryObjectStore, ObjectStore, PageRequest};
///
/// let store = MemoryObjectStore::new("images");
/// let page = store
///     .list_page("events", PageRequest { limit: 1000, offset: 0 })
///     .await?;
/// ```
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Name of the bucket this store operates on.
    fn bucket(&self) -> &str;

    /// Lists one page of objects directly under `partition`.
    ///
    /// Results are sorted by creation time, oldest first, and paths are
    /// partition-qualified. An empty `partition` lists the bucket root.
    /// Unknown or empty partitions yield an empty page.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing request fails.
    async fn list_page(
        &self,
        partition: &str,
        page: PageRequest,
    ) -> Result<Vec<StoredObject>, StoreError>;

    /// Deletes a batch of objects.
    ///
    /// Returns exactly one result per requested path. Missing objects are
    /// reported as `AlreadyGone`, not as failures.
    ///
    /// # Errors
    ///
    /// Returns an error if the whole request fails; no per-path outcome is
    /// known in that case.
    async fn delete_objects(&self, paths: &[String]) -> Result<Vec<DeleteResult>, StoreError>;

    /// Public URL under which the object at `path` is served.
    fn public_url(&self, path: &str) -> String;
}
