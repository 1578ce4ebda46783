//! Run the daemon: cron schedule plus HTTP trigger endpoint.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Config;
use crate::daemon::{self, AppState, metrics, scheduler};

pub async fn execute(config: &Config, port_override: Option<u16>) -> Result<()> {
    super::validate(config)?;

    let port = port_override.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{port}", config.server.host)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{port}", config.server.host))?;

    let runner = Arc::new(super::build_runner(config)?);

    let mut job_scheduler = if config.schedule.enabled {
        Some(scheduler::start_scheduler(&config.schedule.cron, Arc::clone(&runner)).await?)
    } else {
        tracing::info!("Schedule disabled, cleanup runs only on trigger");
        None
    };

    let state = Arc::new(AppState {
        runner,
        trigger_secret: config.trigger_secret(),
        metrics: metrics::init_metrics(),
    });

    println!("asset-gc listening on http://{addr}");
    let served = daemon::serve(state, addr).await;

    if let Some(scheduler) = job_scheduler.as_mut()
        && let Err(e) = scheduler.shutdown().await
    {
        tracing::warn!(error = %e, "Scheduler did not shut down cleanly");
    }

    served
}
