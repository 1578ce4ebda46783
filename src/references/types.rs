//! Types for the reference source interface.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::reliability::retry::is_retryable_status;

/// A table column that may hold a public URL of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceSourceSpec {
    pub table: String,
    pub column: String,
}

impl ReferenceSourceSpec {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Checks both names are plain SQL identifiers.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` naming the offending part.
    pub fn validate(&self) -> Result<(), ReferenceError> {
        validate_identifier(&self.table)?;
        validate_identifier(&self.column)
    }
}

impl fmt::Display for ReferenceSourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// One row returned by a reference query.
///
/// Only the queried column is kept; values that are not strings are
/// dropped at the boundary and arrive here as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRow {
    pub value: Option<String>,
}

impl ReferenceRow {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
        }
    }

    pub fn null() -> Self {
        Self { value: None }
    }
}

/// Errors returned by reference source backends.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum ReferenceError {
    /// Table or column name is not a plain identifier.
    #[error("invalid identifier '{0}': expected [A-Za-z_][A-Za-z0-9_]*")]
    InvalidIdentifier(String),

    /// Credentials were rejected.
    #[error("reference source rejected credentials: {0}")]
    Unauthorized(String),

    /// Non-success HTTP status.
    #[error("reference source returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection, DNS or timeout failure.
    #[error("reference source transport error: {0}")]
    Transport(String),

    /// The response could not be understood.
    #[error("invalid reference source response: {0}")]
    InvalidResponse(String),

    /// Local database failure.
    #[error("database error: {0}")]
    Database(String),

    /// The source is temporarily unable to answer.
    #[error("reference source unavailable: {0}")]
    Unavailable(String),
}

impl ReferenceError {
    /// Returns true if the query may succeed when retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => is_retryable_status(*status),
            Self::Transport(_) | Self::Unavailable(_) => true,
            _ => false,
        }
    }
}

impl From<rusqlite::Error> for ReferenceError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Validates a SQL identifier (table or column name).
///
/// # Errors
///
/// Returns `InvalidIdentifier` if `name` is empty or contains anything
/// other than ASCII letters, digits and underscores, or starts with a digit.
pub fn validate_identifier(name: &str) -> Result<(), ReferenceError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        },
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ReferenceError::InvalidIdentifier(name.to_string()))
    }
}
