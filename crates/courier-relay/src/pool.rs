//! Fan-in publisher pool: one worker per lane, successes into a merge channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{Receiver, Sender};
use tokio_util::sync::CancellationToken;

use courier_core::error::OutboxError;
use courier_core::message::Message;
use courier_core::publisher::Publisher;

/// Publishes lane messages until the lane closes or `cancel` fires.
///
/// A message that exhausts its retry budget is logged and dropped from the
/// cycle; the worker moves on to the next lane item. Successes are forwarded
/// to the merge channel for the consumed collector.
pub(crate) async fn publish_worker<P>(
    worker_id: usize,
    mut lane: Receiver<Message>,
    publisher: Arc<P>,
    attempts: u32,
    retry_delay: Duration,
    merge: Sender<Message>,
    cancel: CancellationToken,
) where
    P: Publisher + ?Sized,
{
    loop {
        let message = tokio::select! {
            () = cancel.cancelled() => break,
            received = lane.recv() => match received {
                Some(message) => message,
                None => break,
            },
        };

        match publish_with_retry(publisher.as_ref(), &message, attempts, retry_delay, &cancel)
            .await
        {
            Ok(()) => {
                tracing::debug!(
                    id = %message.id,
                    routing_key = %message.routing_key,
                    worker_id,
                    "message published"
                );

                let forwarded = tokio::select! {
                    () = cancel.cancelled() => false,
                    sent = merge.send(message) => sent.is_ok(),
                };
                if !forwarded {
                    break;
                }
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    worker_id,
                    "message dropped from cycle, will retry on next fetch"
                );
            }
        }
    }
}

/// Publishes one message with up to `attempts` tries, sleeping `retry_delay`
/// between them and aborting early on cancellation.
pub(crate) async fn publish_with_retry<P>(
    publisher: &P,
    message: &Message,
    attempts: u32,
    retry_delay: Duration,
    cancel: &CancellationToken,
) -> Result<(), OutboxError>
where
    P: Publisher + ?Sized,
{
    let attempts = attempts.max(1);
    let mut last_err = OutboxError::Publish(format!("publish of {} aborted by shutdown", message.id));

    for attempt in 1..=attempts {
        if cancel.is_cancelled() {
            return Err(last_err);
        }

        match publisher
            .publish(&message.exchange, &message.routing_key, message)
            .await
        {
            Ok(()) => return Ok(()),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    id = %message.id,
                    attempt,
                    attempts,
                    "publish attempt failed"
                );
                last_err = err;
            }
        }

        if attempt < attempts {
            tokio::select! {
                () = cancel.cancelled() => return Err(last_err),
                () = tokio::time::sleep(retry_delay) => {}
            }
        }
    }

    Err(last_err)
}
