//! Reliability primitives for calls to the hosted backend.

pub mod retry;

pub use retry::{RetryConfig, is_retryable_status, retry_async};
