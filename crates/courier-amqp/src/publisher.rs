//! AMQP (RabbitMQ) publisher.
//!
//! Publishes outbox messages to the exchange/routing key they carry, with
//! persistent delivery and the event id as the AMQP `message_id`.

use async_trait::async_trait;
use deadpool_lapin::{Manager, Pool, PoolError};
use lapin::BasicProperties;
use lapin::options::BasicPublishOptions;

use courier_core::error::OutboxError;
use courier_core::message::Message;
use courier_core::publisher::Publisher;

/// Configuration for the AMQP connection pool.
#[derive(Clone, Debug)]
pub struct AmqpConfig {
    /// AMQP connection URL (e.g., amqp://localhost:5672).
    pub url: String,
    /// Maximum pooled connections.
    pub pool_size: usize,
}

impl AmqpConfig {
    /// Creates a config with the default pool size.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool_size: 10,
        }
    }
}

/// Publisher backed by a pooled lapin connection.
///
/// Channels are created per publish; the pool amortizes connection setup and
/// makes the publisher safe to share across relay workers.
pub struct AmqpPublisher {
    pool: Pool,
}

impl AmqpPublisher {
    /// Creates the publisher and verifies broker connectivity once.
    ///
    /// # Errors
    ///
    /// Returns a publish error if the pool cannot be built or the broker is
    /// unreachable.
    pub async fn connect(config: AmqpConfig) -> Result<Self, OutboxError> {
        let manager = Manager::new(config.url.clone(), lapin::ConnectionProperties::default());
        let pool = Pool::builder(manager)
            .max_size(config.pool_size)
            .build()
            .map_err(|err| OutboxError::Publish(format!("building AMQP pool failed: {err}")))?;

        pool.get()
            .await
            .map_err(|err| OutboxError::Publish(format!("connecting to AMQP failed: {err}")))?;

        tracing::info!(url = %config.url, "connected to AMQP");

        Ok(Self { pool })
    }

    async fn channel(&self) -> Result<lapin::Channel, OutboxError> {
        let conn = self.pool.get().await.map_err(|err: PoolError| {
            OutboxError::Publish(format!("getting AMQP connection failed: {err}"))
        })?;

        conn.create_channel()
            .await
            .map_err(|err| OutboxError::Publish(format!("creating AMQP channel failed: {err}")))
    }
}

#[async_trait]
impl Publisher for AmqpPublisher {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        message: &Message,
    ) -> Result<(), OutboxError> {
        let payload = message
            .byte_payload()
            .map_err(|err| OutboxError::Publish(format!("encoding payload failed: {err}")))?;

        let channel = self.channel().await?;
        channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default()
                    .with_message_id(message.id.to_string().into())
                    .with_content_type("application/json".into())
                    .with_delivery_mode(2), // persistent
            )
            .await
            .map_err(|err| OutboxError::Publish(format!("publish failed: {err}")))?
            .await
            .map_err(|err| OutboxError::Publish(format!("publish confirmation failed: {err}")))?;

        Ok(())
    }
}
