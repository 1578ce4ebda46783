//! Turning stored public URLs back into object paths.

use percent_encoding::percent_decode_str;
use std::collections::HashSet;

/// Derives the storage-relative path from a stored public URL.
///
/// Everything up to and including the first `/<bucket>/` segment is
/// removed, as is any query string or fragment. The remainder is
/// percent-decoded. Returns `None` when the bucket segment is missing or
/// nothing follows it.
///
/// # Examples
///
/// ```
/// use asset_gc::gc::extract_storage_path;
///
/// let url = "https://p.example.co/storage/v1/object/public/images/events/a%20b.jpg?t=1";
/// assert_eq!(extract_storage_path(url, "images").as_deref(), Some("events/a b.jpg"));
/// assert_eq!(extract_storage_path("https://elsewhere.com/a.jpg", "images"), None);
/// ```
pub fn extract_storage_path(url: &str, bucket: &str) -> Option<String> {
    if bucket.is_empty() {
        return None;
    }

    let marker = format!("/{bucket}/");
    let start = url.find(&marker)? + marker.len();
    let rest = &url[start..];

    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    let encoded = rest[..end].trim();
    if encoded.is_empty() {
        return None;
    }

    let decoded = percent_decode_str(encoded).decode_utf8().ok()?;
    Some(decoded.into_owned())
}

/// Paths referenced by tracked rows, plus the count of values that could
/// not be turned into a path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet {
    paths: HashSet<String>,
    malformed: usize,
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one stored URL, counting it as malformed if it does not
    /// point into `bucket`.
    pub fn add_url(&mut self, url: &str, bucket: &str) {
        match extract_storage_path(url, bucket) {
            Some(path) => {
                self.paths.insert(path);
            },
            None => self.malformed += 1,
        }
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// Number of distinct referenced paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    #[must_use]
    pub fn malformed(&self) -> usize {
        self.malformed
    }
}
