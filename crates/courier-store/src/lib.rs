//! Courier Store — `PostgreSQL` outbox adapters.
//!
//! Provides the relay-side repository ([`PgOutboxStore`]) and the
//! producer-side transactional persister ([`PgOutboxPersister`]).

pub mod pg_outbox_persister;
pub mod pg_outbox_store;
pub mod schema;

pub use pg_outbox_persister::PgOutboxPersister;
pub use pg_outbox_store::PgOutboxStore;
