//! Object store interface and backends.
//!
//! The garbage collector only ever lists and deletes objects in one bucket.
//! Backends:
//! - [`RestObjectStore`] - hosted storage REST API (production)
//! - [`MemoryObjectStore`] - in-memory store with failure injection (tests)

mod backend;
mod memory;
mod rest;
mod types;

pub use backend::ObjectStore;
pub use memory::MemoryObjectStore;
pub use rest::RestObjectStore;
pub use types::{DeleteOutcome, DeleteResult, PageRequest, StoreError, StoredObject};
