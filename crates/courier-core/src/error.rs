//! Outbox error types.

use thiserror::Error;

/// Top-level error type for outbox operations.
#[derive(Debug, Error)]
pub enum OutboxError {
    /// A fetch batch size outside the allowed range was requested.
    #[error("batch size out of range: {0} (expected 1..=10000)")]
    BatchSizeOutOfRange(u32),

    /// A store read or write failed.
    #[error("store error: {0}")]
    Store(String),

    /// A broker publish failed.
    #[error("publish error: {0}")]
    Publish(String),
}
