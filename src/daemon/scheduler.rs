//! Cron schedule for the nightly cleanup.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

use super::runner::{CleanupRunner, RunError, Trigger};
use crate::gc::RunMode;

/// Starts a scheduler that runs the collector on `cron` (UTC).
///
/// Keep the returned scheduler alive; dropping it does not stop the jobs,
/// call `shutdown` for that.
///
/// # Errors
///
/// Returns an error if the cron expression is invalid or the scheduler
/// fails to start.
pub async fn start_scheduler(cron: &str, runner: Arc<CleanupRunner>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new()
        .await
        .context("Failed to create job scheduler")?;

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let runner = Arc::clone(&runner);
        Box::pin(async move {
            info!("Scheduled cleanup starting");
            match runner.run(RunMode::Delete, Trigger::Schedule).await {
                Ok(report) => info!("Scheduled cleanup done: {}", report.summary()),
                Err(RunError::Busy) => warn!("Scheduled cleanup skipped, a run is in progress"),
                // Already logged and recorded by the runner
                Err(RunError::Cleanup(_)) => {},
            }
        })
    })
    .with_context(|| format!("Invalid cron expression: {cron}"))?;

    scheduler
        .add(job)
        .await
        .context("Failed to add cleanup job")?;
    scheduler
        .start()
        .await
        .context("Failed to start job scheduler")?;

    info!(cron, "Cleanup schedule registered");
    Ok(scheduler)
}
