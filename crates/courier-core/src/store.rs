//! Outbox store port.

use async_trait::async_trait;

use crate::error::OutboxError;
use crate::message::Message;

/// Largest fetch batch the relay will accept.
pub const MAX_BATCH_SIZE: u32 = 10_000;

/// A validated fetch batch size in `1..=MAX_BATCH_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSize(u32);

impl BatchSize {
    /// Validates a raw batch size.
    ///
    /// # Errors
    ///
    /// Returns [`OutboxError::BatchSizeOutOfRange`] for `0` or anything above
    /// [`MAX_BATCH_SIZE`].
    pub fn new(size: u32) -> Result<Self, OutboxError> {
        if size == 0 || size > MAX_BATCH_SIZE {
            return Err(OutboxError::BatchSizeOutOfRange(size));
        }

        Ok(Self(size))
    }

    /// Returns the validated value.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

/// Repository port for reading and retiring outbox rows.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Returns at most `batch_size` unconsumed messages in insertion order.
    async fn fetch(&self, batch_size: BatchSize) -> Result<Vec<Message>, OutboxError>;

    /// Marks every message in `messages` consumed.
    ///
    /// Must be idempotent: re-marking an already-consumed row is a no-op.
    async fn mark_consumed(&self, messages: &[Message]) -> Result<(), OutboxError>;
}
