//! HTTP handlers for the trigger daemon.

use axum::{
    Json,
    extract::{ConnectInfo, Query, Request, State},
    http::{HeaderMap, header},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::SocketAddr;

use super::audit::{AuditEvent, log_audit_event};
use super::auth::verify_bearer;
use super::history::RunRecord;
use super::runner::Trigger;
use super::{AppError, SharedState};
use crate::gc::{CleanupReport, RunMode};

const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CleanupQuery {
    #[serde(default)]
    dry_run: bool,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HistoryQuery {
    #[serde(default)]
    limit: Option<usize>,
}

fn remote_addr(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |info| info.0.to_string())
}

fn authorize(state: &SharedState, headers: &HeaderMap, remote_addr: &str) -> Result<(), AppError> {
    let Some(secret) = state.trigger_secret.as_deref() else {
        return Ok(());
    };
    verify_bearer(headers, secret).map_err(|reason| {
        log_audit_event(AuditEvent::AuthFailure {
            remote_addr: remote_addr.to_string(),
            reason: reason.to_string(),
        });
        AppError::Unauthorized("missing or invalid bearer secret".to_string())
    })
}

/// GET /health - Liveness and whether a run is in progress.
pub(crate) async fn health(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "running": state.runner.is_running(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// POST /cron/cleanup - Run the collector now.
pub(crate) async fn cron_cleanup(
    State(state): State<SharedState>,
    Query(query): Query<CleanupQuery>,
    request: Request,
) -> Result<Json<CleanupReport>, AppError> {
    let remote_addr = remote_addr(&request);
    authorize(&state, request.headers(), &remote_addr)?;

    log_audit_event(AuditEvent::TriggerAccepted {
        remote_addr,
        dry_run: query.dry_run,
    });

    let mode = if query.dry_run {
        RunMode::DryRun
    } else {
        RunMode::Delete
    };
    let report = state.runner.run(mode, Trigger::Http).await?;
    Ok(Json(report))
}

/// GET /cron/history - Recent runs, newest first.
pub(crate) async fn cron_history(
    State(state): State<SharedState>,
    Query(query): Query<HistoryQuery>,
    request: Request,
) -> Result<Json<Vec<RunRecord>>, AppError> {
    let remote_addr = remote_addr(&request);
    authorize(&state, request.headers(), &remote_addr)?;

    let history = state.runner.history().ok_or_else(|| {
        AppError::ServiceUnavailable("run history is disabled".to_string())
    })?;
    let records = history
        .recent_async(query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(records))
}

/// GET /metrics - Prometheus exposition format.
pub(crate) async fn metrics(State(state): State<SharedState>) -> Result<impl IntoResponse, AppError> {
    let handle = state.metrics.as_ref().ok_or_else(|| {
        AppError::ServiceUnavailable("metrics recorder is not installed".to_string())
    })?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}
