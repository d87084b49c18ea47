//! `PostgreSQL` implementation of the `OutboxStore` trait.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;
use uuid::Uuid;

use courier_core::error::OutboxError;
use courier_core::message::Message;
use courier_core::store::{BatchSize, OutboxStore};

use crate::schema::DEFAULT_TABLE_NAME;

/// Largest number of event ids updated per `MarkConsumed` statement.
const MARK_CHUNK_SIZE: usize = 1_000;

/// PostgreSQL-backed outbox repository.
#[derive(Debug, Clone)]
pub struct PgOutboxStore {
    pool: PgPool,
    table: String,
}

#[derive(Debug, sqlx::FromRow)]
struct OutboxRow {
    event_id: Uuid,
    event_type: String,
    exchange: String,
    routing_key: String,
    partition_key: Option<i64>,
    payload: serde_json::Value,
    consumed: bool,
    created_at: NaiveDateTime,
}

impl From<OutboxRow> for Message {
    fn from(row: OutboxRow) -> Self {
        Self {
            id: row.event_id,
            event_type: row.event_type,
            payload: row.payload,
            partition_key: row.partition_key,
            exchange: row.exchange,
            routing_key: row.routing_key,
            consumed: row.consumed,
            created_at: row.created_at.and_utc(),
        }
    }
}

impl PgOutboxStore {
    /// Creates a store over the default `outbox_messages` table.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self::with_table(pool, DEFAULT_TABLE_NAME)
    }

    /// Creates a store over a custom outbox table.
    #[must_use]
    pub fn with_table(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }
}

#[async_trait]
impl OutboxStore for PgOutboxStore {
    async fn fetch(&self, batch_size: BatchSize) -> Result<Vec<Message>, OutboxError> {
        let query = format!(
            "SELECT event_id, event_type, exchange, routing_key, partition_key, payload, \
             consumed, created_at \
             FROM {} WHERE consumed = false ORDER BY id ASC LIMIT $1",
            self.table
        );

        let rows: Vec<OutboxRow> = sqlx::query_as(&query)
            .bind(i64::from(batch_size.get()))
            .fetch_all(&self.pool)
            .await
            .map_err(|err| OutboxError::Store(format!("fetching messages failed: {err}")))?;

        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn mark_consumed(&self, messages: &[Message]) -> Result<(), OutboxError> {
        if messages.is_empty() {
            return Ok(());
        }

        let query = format!(
            "UPDATE {} SET consumed = true WHERE event_id = ANY($1)",
            self.table
        );
        let ids: Vec<Uuid> = messages.iter().map(|m| m.id).collect();

        // Re-marking an already-consumed row is a no-op, so chunks that were
        // applied before a failure stay applied.
        for chunk in ids.chunks(MARK_CHUNK_SIZE) {
            sqlx::query(&query)
                .bind(chunk)
                .execute(&self.pool)
                .await
                .map_err(|err| {
                    OutboxError::Store(format!("updating consumed status failed: {err}"))
                })?;
        }

        Ok(())
    }
}
