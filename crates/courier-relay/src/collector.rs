//! Consumed collector: accumulates successfully-published messages.

use tokio::sync::mpsc::Receiver;

use courier_core::message::Message;

/// Drains the merge channel into an accumulator pre-sized to the batch.
///
/// The channel closes once every publish worker has exited, so this returns
/// exactly the cycle's successes, in merge order.
pub(crate) async fn collect(mut merge: Receiver<Message>, capacity: usize) -> Vec<Message> {
    let mut consumed = Vec::with_capacity(capacity);
    while let Some(message) = merge.recv().await {
        consumed.push(message);
    }
    consumed
}
