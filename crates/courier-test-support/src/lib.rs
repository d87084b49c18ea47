//! Shared test mocks and utilities for the Courier relay.

mod publisher;
mod store;

pub use publisher::{FailingPublisher, FlakyPublisher, RecordingPublisher};
pub use store::InMemoryOutboxStore;

use courier_core::message::Message;
use serde_json::json;
use uuid::Uuid;

/// Generates `n` unconsumed messages spread across `partitions` partition
/// keys, with a `seq` payload field recording insertion order.
#[must_use]
pub fn generate_messages(n: usize, partitions: usize) -> Vec<Message> {
    (0..n)
        .map(|i| {
            let mut message = Message::new(
                Uuid::new_v4(),
                "TestEvent",
                json!({ "seq": i }),
                "test-exchange",
                "unused",
                "test.routing.key",
            );
            message.partition_key = Some((i % partitions.max(1)) as i64);
            message
        })
        .collect()
}
