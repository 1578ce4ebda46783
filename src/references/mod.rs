//! Reference sources: where live object references come from.
//!
//! Backends:
//! - [`RestReferenceSource`] - hosted database REST API (production)
//! - [`SqliteReferenceSource`] - local SQLite file (self-hosted)
//! - [`MemoryReferenceSource`] - in-memory rows with failure injection (tests)

mod backend;
mod memory;
mod rest;
mod sqlite;
mod types;

pub use backend::ReferenceSource;
pub use memory::MemoryReferenceSource;
pub use rest::RestReferenceSource;
pub use sqlite::SqliteReferenceSource;
pub use types::{ReferenceError, ReferenceRow, ReferenceSourceSpec, validate_identifier};
