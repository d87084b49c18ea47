//! Integration tests for `PgOutboxStore` and `PgOutboxPersister`.

use futures::FutureExt;
use sqlx::PgPool;
use uuid::Uuid;

use courier_core::message::Message;
use courier_core::store::{BatchSize, OutboxStore};
use courier_store::{PgOutboxPersister, PgOutboxStore};

/// Helper to build a message with sensible defaults.
fn make_message(partition: &str) -> Message {
    Message::new(
        Uuid::new_v4(),
        "TestEvent",
        serde_json::json!({"key": "value"}),
        "test-exchange",
        partition,
        "test.routing.key",
    )
}

async fn seed(pool: &PgPool, messages: Vec<Message>) {
    let persister = PgOutboxPersister::new(pool.clone());
    persister
        .persist_in_tx(move |_tx| async move { Ok(messages) }.boxed())
        .await
        .unwrap();
}

fn batch(size: u32) -> BatchSize {
    BatchSize::new(size).unwrap()
}

// --- fetch ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_fetch_returns_empty_for_empty_table(pool: PgPool) {
    let store = PgOutboxStore::new(pool);

    let messages = store.fetch(batch(100)).await.unwrap();

    assert!(messages.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_fetch_skips_consumed_rows(pool: PgPool) {
    let store = PgOutboxStore::new(pool.clone());
    let kept = make_message("a");
    let retired = make_message("b");
    seed(&pool, vec![kept.clone(), retired.clone()]).await;

    store.mark_consumed(&[retired]).await.unwrap();

    let messages = store.fetch(batch(100)).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, kept.id);
    assert!(!messages[0].consumed);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_fetch_preserves_insertion_order(pool: PgPool) {
    let store = PgOutboxStore::new(pool.clone());
    let seeded: Vec<Message> = (0..5).map(|_| make_message("same-partition")).collect();
    let expected_ids: Vec<Uuid> = seeded.iter().map(|m| m.id).collect();
    seed(&pool, seeded).await;

    let messages = store.fetch(batch(100)).await.unwrap();

    let fetched_ids: Vec<Uuid> = messages.iter().map(|m| m.id).collect();
    assert_eq!(fetched_ids, expected_ids);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_fetch_respects_batch_limit(pool: PgPool) {
    let store = PgOutboxStore::new(pool.clone());
    seed(&pool, (0..10).map(|_| make_message("p")).collect()).await;

    let messages = store.fetch(batch(3)).await.unwrap();

    assert_eq!(messages.len(), 3);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_fetch_round_trips_fields(pool: PgPool) {
    let store = PgOutboxStore::new(pool.clone());
    let seeded = make_message("orders-42");
    let expected_partition = seeded.partition_key;
    let expected_payload = seeded.payload.clone();
    seed(&pool, vec![seeded.clone()]).await;

    let messages = store.fetch(batch(1)).await.unwrap();

    let fetched = &messages[0];
    assert_eq!(fetched.id, seeded.id);
    assert_eq!(fetched.event_type, "TestEvent");
    assert_eq!(fetched.exchange, "test-exchange");
    assert_eq!(fetched.routing_key, "test.routing.key");
    assert_eq!(fetched.partition_key, expected_partition);
    assert_eq!(fetched.payload, expected_payload);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_fetch_maps_missing_partition_key(pool: PgPool) {
    let store = PgOutboxStore::new(pool.clone());
    let mut legacy = make_message("p");
    legacy.partition_key = None;
    seed(&pool, vec![legacy]).await;

    let messages = store.fetch(batch(1)).await.unwrap();

    assert_eq!(messages[0].partition_key, None);
}

// --- mark_consumed ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_mark_consumed_retires_rows(pool: PgPool) {
    let store = PgOutboxStore::new(pool.clone());
    let messages: Vec<Message> = (0..3).map(|_| make_message("p")).collect();
    seed(&pool, messages.clone()).await;

    store.mark_consumed(&messages).await.unwrap();

    let remaining = store.fetch(batch(100)).await.unwrap();
    assert!(remaining.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_mark_consumed_is_idempotent(pool: PgPool) {
    let store = PgOutboxStore::new(pool.clone());
    let message = make_message("p");
    seed(&pool, vec![message.clone()]).await;

    store.mark_consumed(std::slice::from_ref(&message)).await.unwrap();
    store.mark_consumed(std::slice::from_ref(&message)).await.unwrap();

    let remaining = store.fetch(batch(100)).await.unwrap();
    assert!(remaining.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_mark_consumed_empty_input_is_noop(pool: PgPool) {
    let store = PgOutboxStore::new(pool);

    store.mark_consumed(&[]).await.unwrap();
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_mark_consumed_spans_statement_chunks(pool: PgPool) {
    // 1,001 ids forces a second UPDATE statement.
    let store = PgOutboxStore::new(pool.clone());
    let messages: Vec<Message> = (0..1_001).map(|_| make_message("p")).collect();
    seed(&pool, messages.clone()).await;

    store.mark_consumed(&messages).await.unwrap();

    let remaining = store.fetch(batch(10_000)).await.unwrap();
    assert!(remaining.is_empty());
}

// --- persist_in_tx ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_persist_in_tx_commits_messages(pool: PgPool) {
    let persister = PgOutboxPersister::new(pool.clone());
    let store = PgOutboxStore::new(pool);
    let messages: Vec<Message> = (0..2).map(|_| make_message("p")).collect();

    persister
        .persist_in_tx(move |_tx| async move { Ok(messages) }.boxed())
        .await
        .unwrap();

    let fetched = store.fetch(batch(100)).await.unwrap();
    assert_eq!(fetched.len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_persist_in_tx_rolls_back_on_closure_error(pool: PgPool) {
    let persister = PgOutboxPersister::new(pool.clone());
    let store = PgOutboxStore::new(pool);

    let result = persister
        .persist_in_tx(|tx| {
            async move {
                // A business-side write that must not survive the rollback.
                sqlx::query(
                    "INSERT INTO outbox_messages \
                     (event_id, event_type, payload, exchange, routing_key) \
                     VALUES ($1, 'Orphan', '{}', 'ex', 'rk')",
                )
                .bind(Uuid::new_v4())
                .execute(&mut **tx)
                .await
                .map_err(|err| courier_core::error::OutboxError::Store(err.to_string()))?;

                Err(courier_core::error::OutboxError::Store(
                    "business rule violated".to_owned(),
                ))
            }
            .boxed()
        })
        .await;

    assert!(result.is_err());
    let fetched = store.fetch(batch(100)).await.unwrap();
    assert!(fetched.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_persist_in_tx_rejects_duplicate_event_id(pool: PgPool) {
    let persister = PgOutboxPersister::new(pool.clone());
    let store = PgOutboxStore::new(pool.clone());
    let message = make_message("p");
    seed(&pool, vec![message.clone()]).await;

    let duplicate = message.clone();
    let result = persister
        .persist_in_tx(move |_tx| async move { Ok(vec![duplicate]) }.boxed())
        .await;

    assert!(result.is_err());
    let fetched = store.fetch(batch(100)).await.unwrap();
    assert_eq!(fetched.len(), 1);
}
