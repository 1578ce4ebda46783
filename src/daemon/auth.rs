//! Bearer secret check for the trigger endpoints.

use axum::http::{HeaderMap, header};
use subtle::ConstantTimeEq;

/// Checks `Authorization: Bearer <secret>` in constant time.
///
/// Returns the reason on failure, for the audit log.
pub(crate) fn verify_bearer(headers: &HeaderMap, secret: &str) -> Result<(), &'static str> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Err("missing authorization header");
    };
    let Ok(value) = value.to_str() else {
        return Err("authorization header is not valid ASCII");
    };
    let Some(provided) = value.strip_prefix("Bearer ") else {
        return Err("authorization scheme is not Bearer");
    };

    if bool::from(provided.trim().as_bytes().ct_eq(secret.as_bytes())) {
        Ok(())
    } else {
        Err("invalid secret")
    }
}
