//! Garbage collection of unreferenced images.
//!
//! Removes objects from the image bucket that no tracked row references,
//! once they are older than the grace period.
//!
//! # Components
//!
//! - [`GarbageCollector`] - runs the four-phase cleanup pipeline
//! - [`RetentionPolicy`] - partitions, grace period and reference sources
//! - [`CleanupReport`] - what a run scanned, kept, deleted and skipped
//!
//! # Safety
//!
//! A referenced object, an object younger than the grace period and the
//! placeholder marker are never deleted. A failing reference query is
//! recorded as a warning and the run continues without its references;
//! [`ReferenceFailureMode::Abort`] stops the run before any deletion instead.

mod collector;
mod error;
mod policy;
mod reference;
mod report;

#[cfg(test)]
mod tests;

pub use collector::{GarbageCollector, RunMode, classify};
pub use error::{CleanupError, Result};
pub use policy::{ReferenceFailureMode, RetentionPolicy};
pub use reference::{ReferenceSet, extract_storage_path};
pub use report::{CleanupReport, DeleteFailure, Exclusion, ExclusionCounts};
