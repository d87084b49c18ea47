//! Partitioned fan-out: routes the fetched stream into per-partition lanes.

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio_util::sync::CancellationToken;

use courier_core::message::Message;

/// Lane index for a partition key. Messages without a key share lane 0.
pub(crate) fn lane_for(partition_key: Option<i64>, lanes: usize) -> usize {
    let key = partition_key.unwrap_or(0);
    usize::try_from(key.rem_euclid(lanes as i64)).unwrap_or(0)
}

/// Routes `input` into `lanes` until the input closes or `cancel` fires.
///
/// All senders are dropped on return, which closes every lane and signals
/// the publish workers to drain and exit. With `overflow_drop` off (the
/// default), a full lane blocks the router, propagating backpressure to the
/// fetch producer; with it on, the message is dropped from this cycle and
/// redelivered on a later one.
pub(crate) async fn fan_out(
    mut input: Receiver<Message>,
    lanes: Vec<Sender<Message>>,
    overflow_drop: bool,
    cancel: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            () = cancel.cancelled() => break,
            received = input.recv() => match received {
                Some(message) => message,
                None => break,
            },
        };

        let lane = lane_for(message.partition_key, lanes.len());

        if overflow_drop {
            match lanes[lane].try_send(message) {
                Ok(()) => {}
                Err(TrySendError::Full(dropped)) => {
                    tracing::warn!(id = %dropped.id, lane, "lane full, dropping message from cycle");
                }
                Err(TrySendError::Closed(_)) => break,
            }
        } else {
            let delivered = tokio::select! {
                () = cancel.cancelled() => break,
                sent = lanes[lane].send(message) => sent.is_ok(),
            };
            if !delivered {
                break;
            }
        }
    }
}
