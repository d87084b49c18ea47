//! Test publishers — mock `Publisher` implementations.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use courier_core::error::OutboxError;
use courier_core::message::Message;
use courier_core::publisher::Publisher;

/// A publisher that records every delivered message in publish order.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<Message>>,
}

impl RecordingPublisher {
    /// Creates a new recording publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all published messages, in publish order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn published(&self) -> Vec<Message> {
        self.published.lock().unwrap().clone()
    }

    /// Number of publishes observed.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn published_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(
        &self,
        _exchange: &str,
        _routing_key: &str,
        message: &Message,
    ) -> Result<(), OutboxError> {
        self.published.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// A publisher that fails the first attempt for every message and succeeds
/// on subsequent attempts. Useful for exercising the retry path.
#[derive(Debug, Default)]
pub struct FlakyPublisher {
    seen: Mutex<HashSet<Uuid>>,
    published: Mutex<Vec<Message>>,
}

impl FlakyPublisher {
    /// Creates a new flaky publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all published messages, in publish order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn published(&self) -> Vec<Message> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for FlakyPublisher {
    async fn publish(
        &self,
        _exchange: &str,
        _routing_key: &str,
        message: &Message,
    ) -> Result<(), OutboxError> {
        if self.seen.lock().unwrap().insert(message.id) {
            return Err(OutboxError::Publish("temporary broker hiccup".to_owned()));
        }

        self.published.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// A publisher that always fails. Useful for testing the at-least-once
/// boundary: nothing it touches may be marked consumed.
#[derive(Debug, Default)]
pub struct FailingPublisher {
    attempts: Mutex<usize>,
}

impl FailingPublisher {
    /// Creates a new failing publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of publish attempts observed.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl Publisher for FailingPublisher {
    async fn publish(
        &self,
        _exchange: &str,
        _routing_key: &str,
        _message: &Message,
    ) -> Result<(), OutboxError> {
        *self.attempts.lock().unwrap() += 1;
        Err(OutboxError::Publish("broker unreachable".to_owned()))
    }
}
