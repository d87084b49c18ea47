//! Producer-side transactional persister.

use futures::future::BoxFuture;
use sqlx::{PgPool, Postgres, Transaction};

use courier_core::error::OutboxError;
use courier_core::message::Message;

use crate::schema::DEFAULT_TABLE_NAME;

/// A database transaction handed to the persist closure.
pub type PgTx = Transaction<'static, Postgres>;

/// Inserts outbox messages atomically with the caller's business mutations.
#[derive(Debug, Clone)]
pub struct PgOutboxPersister {
    pool: PgPool,
    table: String,
}

impl PgOutboxPersister {
    /// Creates a persister over the default `outbox_messages` table.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self::with_table(pool, DEFAULT_TABLE_NAME)
    }

    /// Creates a persister over a custom outbox table.
    #[must_use]
    pub fn with_table(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }

    /// Opens a transaction, runs `build` for the business-side mutations,
    /// inserts every message it returns, and commits atomically.
    ///
    /// # Errors
    ///
    /// Any error from `build` or from an insert rolls the transaction back
    /// and is returned to the caller; a rollback failure wraps the original
    /// error.
    pub async fn persist_in_tx<F>(&self, build: F) -> Result<(), OutboxError>
    where
        F: for<'t> FnOnce(&'t mut PgTx) -> BoxFuture<'t, Result<Vec<Message>, OutboxError>>
            + Send,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| OutboxError::Store(format!("transaction begin failed: {err}")))?;

        let messages = match build(&mut tx).await {
            Ok(messages) => messages,
            Err(err) => return Err(Self::rollback(tx, err).await),
        };

        let query = format!(
            "INSERT INTO {} (event_id, event_type, payload, exchange, routing_key, partition_key) \
             VALUES ($1, $2, $3, $4, $5, $6)",
            self.table
        );

        for message in &messages {
            let inserted = sqlx::query(&query)
                .bind(message.id)
                .bind(&message.event_type)
                .bind(&message.payload)
                .bind(&message.exchange)
                .bind(&message.routing_key)
                .bind(message.partition_key)
                .execute(&mut *tx)
                .await;

            if let Err(err) = inserted {
                let err = OutboxError::Store(format!("persisting message failed: {err}"));
                return Err(Self::rollback(tx, err).await);
            }
        }

        tx.commit()
            .await
            .map_err(|err| OutboxError::Store(format!("transaction commit failed: {err}")))
    }

    async fn rollback(tx: PgTx, original: OutboxError) -> OutboxError {
        match tx.rollback().await {
            Ok(()) => original,
            Err(rollback_err) => OutboxError::Store(format!(
                "transaction rollback failed: {rollback_err} (while handling: {original})"
            )),
        }
    }
}
