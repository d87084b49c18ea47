//! Outbox message model and partition hashing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 16_777_619;

/// FNV-1a 32-bit hash of a byte slice.
///
/// The hash value is persisted alongside the message and drives lane routing,
/// so it must stay stable across processes and releases.
#[must_use]
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Derives a partition key from an application-supplied string.
///
/// The unsigned 32-bit hash is zero-extended into the non-negative half of
/// `i64`; it is never re-hashed on the way to a lane.
#[must_use]
pub fn partition_key_for(input: &str) -> i64 {
    i64::from(fnv1a_32(input.as_bytes()))
}

/// A domain event staged in the outbox table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Application-assigned event identifier, unique per event.
    pub id: Uuid,
    /// Free-form event taxonomy name.
    pub event_type: String,
    /// Opaque payload; serialized to bytes at publish time.
    pub payload: serde_json::Value,
    /// Partition key deciding which lane orders this message. Legacy rows
    /// may lack one.
    pub partition_key: Option<i64>,
    /// Broker exchange the message is addressed to.
    pub exchange: String,
    /// Broker topic used on publish.
    pub routing_key: String,
    /// Whether the relay has already delivered this message.
    pub consumed: bool,
    /// Wall-clock creation time.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Builds a new unconsumed message, deriving the partition key from
    /// `partition` via [`partition_key_for`].
    #[must_use]
    pub fn new(
        id: Uuid,
        event_type: impl Into<String>,
        payload: serde_json::Value,
        exchange: impl Into<String>,
        partition: &str,
        routing_key: impl Into<String>,
    ) -> Self {
        Self {
            id,
            event_type: event_type.into(),
            payload,
            partition_key: Some(partition_key_for(partition)),
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            consumed: false,
            created_at: Utc::now(),
        }
    }

    /// Returns the wire bytes for this message.
    ///
    /// String payloads pass through verbatim as UTF-8; everything else is
    /// JSON-encoded.
    ///
    /// # Errors
    ///
    /// Returns a serialization error for payloads `serde_json` cannot encode;
    /// primitive and map payloads always succeed.
    pub fn byte_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        match &self.payload {
            serde_json::Value::String(s) => Ok(s.clone().into_bytes()),
            other => serde_json::to_vec(other),
        }
    }
}
