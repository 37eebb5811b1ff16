use tracing::warn;

use crate::channel::AdminChannel;
use crate::error::InspectError;
use crate::message::DeadLetterMessage;
use crate::report::{BodyPreview, InspectReport, InspectedMessage};

/// Read up to `limit` messages from a queue without consuming them.
///
/// Each message is fetched without pre-acknowledgement, recorded, then
/// rejected with requeue, which restores it to the head of the queue. The
/// guarantee is that the queue's net message count is unchanged afterwards,
/// NOT that the positions shown are distinct messages: because requeue lands
/// at the head, a sequential reader may be handed the same message on every
/// iteration. Whether the broker cycles through distinct messages depends on
/// its redelivery ordering and on concurrent consumers, and is explicitly
/// not guaranteed here. The `redelivered` flag on each entry is the hint.
///
/// Bodies that fail to parse as JSON are surfaced raw; they never abort the
/// batch. A transient channel failure stops the loop and is recorded on the
/// report alongside whatever was already gathered.
pub async fn inspect_queue<C: AdminChannel + ?Sized>(
    channel: &mut C,
    queue: &str,
    limit: usize,
) -> Result<InspectReport, InspectError> {
    if channel.queue_status(queue).await?.is_none() {
        return Err(InspectError::QueueNotFound(queue.to_string()));
    }

    let mut messages = Vec::new();
    let mut aborted = None;

    for position in 1..=limit {
        let delivery = match channel.fetch(queue).await {
            Ok(Some(delivery)) => delivery,
            Ok(None) => break,
            Err(err) => {
                warn!(%queue, position, error = %err, "fetch failed, stopping inspection");
                aborted = Some(err.to_string());
                break;
            }
        };

        let delivery_tag = delivery.delivery_tag;
        let message = DeadLetterMessage::from(delivery);
        let preview = BodyPreview::from_bytes(&message.body);

        // Put the message back before moving on; inspection must not consume.
        // If the requeue itself fails the delivery stays unacknowledged and
        // the broker restores it when the connection closes, so the net
        // count is still preserved.
        let requeue = channel.reject_requeue(delivery_tag).await;
        messages.push(InspectedMessage {
            position,
            message,
            preview,
        });
        if let Err(err) = requeue {
            warn!(%queue, delivery_tag, error = %err, "requeue failed, stopping inspection");
            aborted = Some(err.to_string());
            break;
        }
    }

    Ok(InspectReport {
        queue: queue.to_string(),
        messages,
        aborted,
    })
}
