//! Types for the object store interface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reliability::retry::is_retryable_status;

/// One object listed from the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredObject {
    /// Partition-qualified key (e.g., "events/1700000000-abc123.jpg")
    pub path: String,
    /// Upload timestamp assigned by the store. `None` for folder-like
    /// entries the store lists without metadata.
    pub created_at: Option<DateTime<Utc>>,
}

impl StoredObject {
    /// Creates a dated object entry.
    pub fn new(path: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            created_at: Some(created_at),
        }
    }

    /// Creates an entry without a creation timestamp.
    pub fn undated(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            created_at: None,
        }
    }

    /// Age of the object at `now`, if the store reported a timestamp.
    ///
    /// Negative when the store clock is ahead of ours.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.created_at.map(|created| now - created)
    }
}

/// Pagination window for a listing request.
///
/// Listings are always sorted by creation time, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u32,
}

/// Per-path result of a delete request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The object existed and was removed.
    Deleted,
    /// The object was not present (already removed by a concurrent run).
    AlreadyGone,
    /// The store refused or failed to remove the object.
    Failed(String),
}

/// Outcome of deleting one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResult {
    pub path: String,
    pub outcome: DeleteOutcome,
}

impl DeleteResult {
    pub fn new(path: impl Into<String>, outcome: DeleteOutcome) -> Self {
        Self {
            path: path.into(),
            outcome,
        }
    }
}

/// Errors returned by object store backends.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Credentials were rejected. Never retried.
    #[error("object store rejected credentials: {0}")]
    Unauthorized(String),

    /// Non-success HTTP status.
    #[error("object store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection, DNS or timeout failure.
    #[error("object store transport error: {0}")]
    Transport(String),

    /// The response body could not be understood.
    #[error("invalid object store response: {0}")]
    InvalidResponse(String),

    /// The store is temporarily unable to serve the request.
    #[error("object store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Returns true if the request may succeed when retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => is_retryable_status(*status),
            Self::Transport(_) | Self::Unavailable(_) => true,
            Self::Unauthorized(_) | Self::InvalidResponse(_) => false,
        }
    }
}
