//! Prometheus metrics for cleanup runs.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use super::runner::Trigger;
use crate::gc::CleanupReport;

/// Runs by trigger and outcome (`ok`, `partial`, `failed`, `rejected`).
pub const RUNS_TOTAL: &str = "asset_gc_runs_total";

/// Objects removed by real runs.
pub const OBJECTS_DELETED: &str = "asset_gc_objects_deleted_total";

/// Candidates the store refused to delete.
pub const DELETE_FAILURES: &str = "asset_gc_delete_failures_total";

/// Wall-clock duration of runs.
pub const RUN_DURATION: &str = "asset_gc_run_duration_seconds";

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the global Prometheus recorder.
///
/// Safe to call multiple times. Returns `None` if another recorder was
/// already installed by someone else; metrics calls are then no-ops.
pub fn init_metrics() -> Option<PrometheusHandle> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Some(handle.clone());
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            describe_counter!(RUNS_TOTAL, "Cleanup runs by trigger and outcome");
            describe_counter!(OBJECTS_DELETED, "Objects deleted by cleanup runs");
            describe_counter!(DELETE_FAILURES, "Deletion candidates that failed to delete");
            describe_histogram!(RUN_DURATION, "Duration of cleanup runs in seconds");

            tracing::info!("Prometheus metrics recorder initialized");
            Some(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
        },
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install Prometheus recorder");
            None
        },
    }
}

/// Records a finished run.
pub fn record_run(trigger: Trigger, report: &CleanupReport, duration: Duration) {
    let outcome = if report.is_clean() { "ok" } else { "partial" };
    counter!(RUNS_TOTAL, "trigger" => trigger.as_str(), "outcome" => outcome).increment(1);
    counter!(OBJECTS_DELETED).increment(report.deleted.len() as u64);
    counter!(DELETE_FAILURES).increment(report.failed.len() as u64);
    histogram!(RUN_DURATION, "trigger" => trigger.as_str()).record(duration.as_secs_f64());
}

/// Records a run that ended with a fatal error.
pub fn record_failed_run(trigger: Trigger, duration: Duration) {
    counter!(RUNS_TOTAL, "trigger" => trigger.as_str(), "outcome" => "failed").increment(1);
    histogram!(RUN_DURATION, "trigger" => trigger.as_str()).record(duration.as_secs_f64());
}

/// Records a trigger refused because another run held the lock.
pub fn record_rejected_run(trigger: Trigger) {
    counter!(RUNS_TOTAL, "trigger" => trigger.as_str(), "outcome" => "rejected").increment(1);
}
