//! CLI command implementations for asset-gc.
//!
//! - [`run`] - One cleanup run in the foreground
//! - [`serve`] - Cron schedule plus HTTP trigger endpoint
//! - [`check_config`] - Validate the configuration file
//! - [`history`] - Print recent runs

pub mod check_config;
pub mod history;
pub mod run;
pub mod serve;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::{Config, ReferenceBackend, ValidationResult};
use crate::daemon::{CleanupRunner, HistoryStore};
use crate::gc::GarbageCollector;
use crate::hosted::HostedClient;
use crate::references::{ReferenceSource, RestReferenceSource, SqliteReferenceSource};
use crate::reliability::RetryConfig;
use crate::storage::RestObjectStore;

/// Initialize logging to stderr, as JSON lines when `json` is set.
///
/// Honors `RUST_LOG`; defaults to `info`.
pub fn init_logging(json: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

/// Validates the config and prints warnings to stderr.
pub fn validate(config: &Config) -> Result<ValidationResult> {
    let result = config.validate()?;
    for warning in &result.warnings {
        eprintln!("Warning: {warning}");
    }
    Ok(result)
}

/// Builds the collector over the configured backends.
///
/// # Errors
///
/// Returns an error if the service key is missing, a backend cannot be
/// reached for setup, or the policy is invalid.
pub fn build_collector(config: &Config) -> Result<GarbageCollector> {
    let url = config
        .backend
        .url
        .as_deref()
        .context("backend.url is not configured")?;
    let client = HostedClient::new(
        url,
        config.service_key()?,
        Duration::from_secs(config.backend.timeout_secs),
    )?
    .with_retry(RetryConfig::hosted().with_retries(config.backend.max_retries));

    let store = Arc::new(RestObjectStore::new(client.clone(), &config.backend.bucket));

    let references: Arc<dyn ReferenceSource> = match config.references.backend {
        ReferenceBackend::Rest => Arc::new(RestReferenceSource::new(
            client,
            config.references.page_size,
        )),
        ReferenceBackend::Sqlite => {
            let path = config
                .references
                .sqlite_path
                .as_deref()
                .context("references.sqlite_path is not configured")?;
            Arc::new(SqliteReferenceSource::open(path)?)
        },
    };

    GarbageCollector::new(store, references, config.to_policy()).map_err(Into::into)
}

/// Builds a runner with history when the database can be opened.
pub fn build_runner(config: &Config) -> Result<CleanupRunner> {
    let collector = build_collector(config)?;
    let history = match HistoryStore::open(config.history_path(), config.history.keep) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(error = %e, "Run history disabled");
            None
        },
    };
    Ok(CleanupRunner::new(collector, history))
}
