//! Security audit logging for the trigger endpoint.
//!
//! Events go to the `audit` tracing target so they can be routed or
//! filtered separately (`RUST_LOG=audit=info`).

use tracing::{info, warn};

use super::runner::Trigger;

/// Security-relevant trigger events.
#[derive(Debug, Clone)]
pub enum AuditEvent {
    /// Request to a protected endpoint without a valid bearer secret
    AuthFailure { remote_addr: String, reason: String },
    /// Cleanup accepted from the HTTP trigger
    TriggerAccepted { remote_addr: String, dry_run: bool },
    /// Trigger refused because a run was in progress
    RunRejectedBusy { trigger: Trigger },
}

/// Log a security audit event with structured fields.
pub fn log_audit_event(event: AuditEvent) {
    match event {
        AuditEvent::AuthFailure {
            remote_addr,
            reason,
        } => {
            warn!(
                target: "audit",
                event_type = "auth_failure",
                %remote_addr,
                %reason,
                "Authentication failed"
            );
        },
        AuditEvent::TriggerAccepted {
            remote_addr,
            dry_run,
        } => {
            info!(
                target: "audit",
                event_type = "trigger_accepted",
                %remote_addr,
                dry_run,
                "Cleanup triggered over HTTP"
            );
        },
        AuditEvent::RunRejectedBusy { trigger } => {
            warn!(
                target: "audit",
                event_type = "run_rejected_busy",
                trigger = trigger.as_str(),
                "Cleanup already running, trigger rejected"
            );
        },
    }
}
