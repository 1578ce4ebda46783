//! Long-running trigger daemon.
//!
//! Runs the cleanup on a cron schedule and exposes an HTTP API:
//!
//! - `GET /health` - liveness
//! - `POST /cron/cleanup[?dry_run=true]` - run now (bearer secret)
//! - `GET /cron/history[?limit=N]` - recent runs (bearer secret)
//! - `GET /metrics` - Prometheus metrics

pub mod audit;
mod auth;
mod handlers;
pub mod history;
pub mod metrics;
pub mod runner;
pub mod scheduler;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

pub use history::{HistoryStore, RunRecord};
pub use runner::{CleanupRunner, RunError, Trigger};

/// State shared by every handler.
pub struct AppState {
    pub runner: Arc<CleanupRunner>,
    /// `None` leaves the trigger endpoints unauthenticated.
    pub trigger_secret: Option<String>,
    pub metrics: Option<PrometheusHandle>,
}

pub type SharedState = Arc<AppState>;

/// Errors returned by handlers as `{ "error": "..." }`.
#[derive(Debug)]
pub enum AppError {
    Unauthorized(String),
    Conflict(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<RunError> for AppError {
    fn from(e: RunError) -> Self {
        match e {
            RunError::Busy => Self::Conflict(e.to_string()),
            RunError::Cleanup(e) => Self::Internal(e.to_string()),
        }
    }
}

/// Builds the HTTP router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/cron/cleanup", post(handlers::cron_cleanup))
        .route("/cron/history", get(handlers::cron_history))
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
}

/// Serves the router on `addr` until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(state: SharedState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Trigger endpoint listening");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
