//! Test stores — in-memory `OutboxStore` implementations.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use courier_core::error::OutboxError;
use courier_core::message::Message;
use courier_core::store::{BatchSize, OutboxStore};

#[derive(Debug, Default)]
struct Inner {
    messages: Vec<Message>,
    consumed: HashSet<Uuid>,
    fetch_calls: usize,
    fail_fetch: bool,
    fail_mark: bool,
}

/// A thread-safe in-memory outbox. `fetch` returns unconsumed messages in
/// insertion order; `mark_consumed` retires them idempotently. Either
/// operation can be configured to fail for error-path tests.
#[derive(Debug, Default)]
pub struct InMemoryOutboxStore {
    inner: Mutex<Inner>,
}

impl InMemoryOutboxStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with `messages`.
    #[must_use]
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                messages,
                ..Inner::default()
            }),
        }
    }

    /// Makes every subsequent `fetch` fail.
    pub fn fail_fetch(&self) {
        self.inner.lock().unwrap().fail_fetch = true;
    }

    /// Makes every subsequent `mark_consumed` fail.
    pub fn fail_mark(&self) {
        self.inner.lock().unwrap().fail_mark = true;
    }

    /// Number of `fetch` calls observed.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn fetch_calls(&self) -> usize {
        self.inner.lock().unwrap().fetch_calls
    }

    /// Number of messages currently marked consumed.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn consumed_count(&self) -> usize {
        self.inner.lock().unwrap().consumed.len()
    }

    /// Number of messages still awaiting delivery.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn unconsumed_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner
            .messages
            .iter()
            .filter(|m| !inner.consumed.contains(&m.id))
            .count()
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutboxStore {
    async fn fetch(&self, batch_size: BatchSize) -> Result<Vec<Message>, OutboxError> {
        let mut inner = self.inner.lock().unwrap();
        inner.fetch_calls += 1;

        if inner.fail_fetch {
            return Err(OutboxError::Store("connection refused".to_owned()));
        }

        let batch = inner
            .messages
            .iter()
            .filter(|m| !inner.consumed.contains(&m.id))
            .take(batch_size.get() as usize)
            .cloned()
            .collect();
        Ok(batch)
    }

    async fn mark_consumed(&self, messages: &[Message]) -> Result<(), OutboxError> {
        let mut inner = self.inner.lock().unwrap();

        if inner.fail_mark {
            return Err(OutboxError::Store("connection refused".to_owned()));
        }

        for message in messages {
            inner.consumed.insert(message.id);
        }
        Ok(())
    }
}
