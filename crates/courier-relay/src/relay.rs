//! The relay loop: fetch → fan-out → publish → mark, one drained cycle at a
//! time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use courier_core::error::OutboxError;
use courier_core::message::Message;
use courier_core::publisher::Publisher;
use courier_core::store::{BatchSize, OutboxStore};

use crate::collector::collect;
use crate::config::{MERGE_CAPACITY, RelayConfig};
use crate::fanout::fan_out;
use crate::pool::publish_worker;

/// Bound on the final mark-consumed flush of a cancelled cycle.
const SHUTDOWN_MARK_TIMEOUT: Duration = Duration::from_secs(5);

/// Long-running relay between an outbox store and a broker publisher.
pub struct Relay<S, P> {
    store: Arc<S>,
    publisher: Arc<P>,
    config: RelayConfig,
}

impl<S, P> Relay<S, P>
where
    S: OutboxStore,
    P: Publisher + 'static,
{
    /// Creates a new relay.
    #[must_use]
    pub fn new(store: Arc<S>, publisher: Arc<P>, config: RelayConfig) -> Self {
        Self {
            store,
            publisher,
            config,
        }
    }

    /// Runs fetch/publish/mark cycles until `cancel` fires.
    ///
    /// Per-message failures are logged, never surfaced; the next cycle
    /// re-fetches whatever was not marked consumed.
    ///
    /// # Errors
    ///
    /// Returns [`OutboxError::BatchSizeOutOfRange`] before the first cycle if
    /// `batch_size` is invalid. Cancellation returns `Ok(())`.
    pub async fn run(&self, cancel: CancellationToken, batch_size: u32) -> Result<(), OutboxError> {
        let batch_size = BatchSize::new(batch_size)?;
        tracing::info!(
            batch_size = batch_size.get(),
            partitions = self.config.partitions,
            "relay started"
        );

        while !cancel.is_cancelled() {
            self.run_cycle(&cancel, batch_size).await;

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.config.publish_delay) => {}
            }
        }

        tracing::info!("relay stopped");
        Ok(())
    }

    async fn run_cycle(&self, cancel: &CancellationToken, batch_size: BatchSize) {
        let fetched = tokio::select! {
            () = cancel.cancelled() => return,
            fetched = self.store.fetch(batch_size) => fetched,
        };
        let messages = match fetched {
            Ok(messages) => messages,
            Err(err) => {
                tracing::warn!(error = %err, "fetching messages failed, ending cycle");
                return;
            }
        };
        if messages.is_empty() {
            return;
        }
        tracing::info!(count = messages.len(), "received messages from outbox");

        let cycle = cancel.child_token();
        match self.config.cycle_timeout {
            Some(limit) => {
                let pipeline = self.drive_pipeline(cycle.clone(), batch_size, messages);
                tokio::pin!(pipeline);
                tokio::select! {
                    () = &mut pipeline => {}
                    () = tokio::time::sleep(limit) => {
                        tracing::warn!(
                            timeout = ?limit,
                            "cycle timed out, cancelling in-flight work"
                        );
                        cycle.cancel();
                        pipeline.await;
                    }
                }
            }
            None => self.drive_pipeline(cycle, batch_size, messages).await,
        }
    }

    /// One cycle's pipeline: feeder → router → N workers → collector, joined
    /// before returning so cycles never overlap.
    async fn drive_pipeline(
        &self,
        cycle: CancellationToken,
        batch_size: BatchSize,
        messages: Vec<Message>,
    ) {
        let lanes = self.config.partitions.max(1);
        let (input_tx, input_rx) = mpsc::channel(batch_size.get() as usize);
        let (merge_tx, merge_rx) = mpsc::channel(MERGE_CAPACITY);

        let mut workers = JoinSet::new();
        let mut lane_txs = Vec::with_capacity(lanes);
        for worker_id in 0..lanes {
            let (lane_tx, lane_rx) = mpsc::channel(self.config.lane_capacity);
            lane_txs.push(lane_tx);
            workers.spawn(publish_worker(
                worker_id,
                lane_rx,
                Arc::clone(&self.publisher),
                self.config.publish_retry_attempts,
                self.config.publish_retry_delay,
                merge_tx.clone(),
                cycle.clone(),
            ));
        }
        // Workers hold the only remaining merge senders; the channel closes
        // when the last worker exits.
        drop(merge_tx);

        let feeder = tokio::spawn(feed(input_tx, messages, cycle.clone()));
        let router = tokio::spawn(fan_out(
            input_rx,
            lane_txs,
            self.config.overflow_drop,
            cycle.clone(),
        ));
        let collector = tokio::spawn(collect(merge_rx, batch_size.get() as usize));

        while let Some(result) = workers.join_next().await {
            if let Err(err) = result {
                tracing::error!(error = %err, "publish worker task failed");
            }
        }
        if let Err(err) = feeder.await {
            tracing::error!(error = %err, "fetch producer task failed");
        }
        if let Err(err) = router.await {
            tracing::error!(error = %err, "fan-out task failed");
        }
        let consumed = match collector.await {
            Ok(consumed) => consumed,
            Err(err) => {
                tracing::error!(error = %err, "collector task failed");
                Vec::new()
            }
        };

        self.flush_consumed(&cycle, consumed).await;
    }

    async fn flush_consumed(&self, cycle: &CancellationToken, consumed: Vec<Message>) {
        if consumed.is_empty() {
            return;
        }

        let mark = self.store.mark_consumed(&consumed);
        let result = if cycle.is_cancelled() {
            // Best-effort flush of already-published successes on the way out.
            match tokio::time::timeout(SHUTDOWN_MARK_TIMEOUT, mark).await {
                Ok(result) => result,
                Err(_elapsed) => Err(OutboxError::Store(
                    "final mark-consumed flush timed out".to_owned(),
                )),
            }
        } else {
            mark.await
        };

        match result {
            Ok(()) => {
                tracing::info!(count = consumed.len(), "published messages marked consumed");
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    count = consumed.len(),
                    "marking consumed failed, messages will be redelivered"
                );
            }
        }
    }
}

/// Fetch producer: streams the batch into the fan-out input lane.
async fn feed(input: mpsc::Sender<Message>, messages: Vec<Message>, cancel: CancellationToken) {
    for message in messages {
        let sent = tokio::select! {
            () = cancel.cancelled() => false,
            sent = input.send(message) => sent.is_ok(),
        };
        if !sent {
            return;
        }
    }
}
