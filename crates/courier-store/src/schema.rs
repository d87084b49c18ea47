//! Outbox database schema.

/// Default name of the outbox table.
pub const DEFAULT_TABLE_NAME: &str = "outbox_messages";

/// SQL to create the outbox table.
///
/// The `id` bigserial gives insertion order; `event_id` is the
/// application-assigned identity. The partial index covers the relay's
/// fetch predicate.
pub const CREATE_OUTBOX_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS outbox_messages (
    id            BIGSERIAL PRIMARY KEY,
    event_id      UUID NOT NULL UNIQUE,
    consumed      BOOLEAN NOT NULL DEFAULT FALSE,
    event_type    VARCHAR(255) NOT NULL,
    payload       JSONB NOT NULL,
    exchange      VARCHAR(255) NOT NULL,
    routing_key   VARCHAR(255) NOT NULL,
    partition_key BIGINT,
    created_at    TIMESTAMP(0) NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_outbox_messages_unconsumed
    ON outbox_messages (id)
    WHERE consumed = FALSE;
";
