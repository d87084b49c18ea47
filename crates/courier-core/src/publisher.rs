//! Broker publisher port.

use async_trait::async_trait;

use crate::error::OutboxError;
use crate::message::Message;

/// Port for delivering a single message to the broker.
///
/// Implementations must be safe to call from multiple relay workers
/// concurrently. Retries are the relay's concern, not the publisher's.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Delivers `message` to `(exchange, routing_key)`.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: &Message,
    ) -> Result<(), OutboxError>;
}
