//! asset-gc: garbage collection of unreferenced images.
//!
//! Lists the objects of an image bucket, collects every public URL stored
//! in the tracked table columns, and deletes the objects nothing points to
//! once they are older than a grace period.
//!
//! - [`gc`] - the collector, its policy and reports
//! - [`storage`] / [`references`] - backends behind the collector
//! - [`daemon`] - cron schedule, HTTP trigger and run history
//! - [`commands`] - CLI entry points

pub mod commands;
pub mod config;
pub mod constants;
pub mod daemon;
pub mod gc;
pub mod hosted;
pub mod references;
pub mod reliability;
pub mod storage;
