//! Backend trait for reference sources.
//!
//! A reference source answers one question: which non-null values does a
//! given column hold? The collector turns those values into object paths.

use super::types::{ReferenceError, ReferenceRow};
use async_trait::async_trait;

/// Backend trait for the relational query source.
///
/// All backends must be thread-safe (`Send + Sync`) for use with tokio.
///
/// # Example
///
/// ```ignore
/// use asset_gc::references::{MemoryReferenceSource, ReferenceSource};
///
/// let source = MemoryReferenceSource::new();
/// source.insert("events", "image_url", "https://.../images/events/a.jpg");
/// let rows = source.select_non_null("events", "image_url").await?;
/// ```
#[async_trait]
pub trait ReferenceSource: Send + Sync + 'static {
    /// Returns every row of `table` whose `column` is not NULL.
    ///
    /// Implementations must return all matching rows, paging internally
    /// where the backend caps result sizes.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifiers are invalid or the query fails.
    async fn select_non_null(
        &self,
        table: &str,
        column: &str,
    ) -> Result<Vec<ReferenceRow>, ReferenceError>;
}
