//! Errors that fail a whole cleanup run.
//!
//! Everything recoverable (one partition failing to list, one delete
//! failing) is recorded in the report instead.

use std::time::Duration;

use crate::references::ReferenceError;

/// Result type for collector operations.
pub type Result<T> = std::result::Result<T, CleanupError>;

/// Fatal cleanup errors. No object is deleted when one of these is returned.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CleanupError {
    /// Policy failed validation.
    #[error("invalid retention policy: {0}")]
    InvalidPolicy(String),

    /// Credentials rejected or every partition listing failed.
    #[error("object store unavailable: {0}")]
    StoreUnavailable(String),

    /// A reference query failed and the policy says to abort.
    #[error("reference query on {source_name} failed: {error}")]
    ReferenceQueryFailed {
        source_name: String,
        #[source]
        error: ReferenceError,
    },

    /// The deadline passed before the deletion phase started.
    #[error("cleanup deadline of {}s exceeded during {phase}", .deadline.as_secs())]
    DeadlineExceeded {
        deadline: Duration,
        phase: &'static str,
    },
}
