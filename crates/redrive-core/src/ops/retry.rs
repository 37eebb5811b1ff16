use chrono::Utc;
use tracing::{debug, warn};

use crate::channel::{AdminChannel, OutboundMessage};
use crate::error::RetryError;
use crate::message::DeadLetterMessage;
use crate::queue;
use crate::report::RetryReport;

/// Move up to `count` messages from a dead-letter queue back to its origin
/// queue, resetting their retry-tracking headers.
///
/// The target is derived by stripping the dead-letter suffix from `source`
/// unless given explicitly. Both queues are checked passively up front:
/// publishing to a nonexistent queue on the default exchange would silently
/// drop the message, which this operation must never do.
///
/// Per message the ordering is publish first, acknowledge after the broker
/// has confirmed the copy. A crash between the two leaves the message in
/// both queues (at-least-once); the reverse order could lose it and is
/// rejected. Transient failures abort the remainder of the batch (never
/// the messages already moved) and are recorded on the report.
pub async fn retry_messages<C: AdminChannel + ?Sized>(
    channel: &mut C,
    source: &str,
    count: usize,
    target: Option<&str>,
) -> Result<RetryReport, RetryError> {
    let target = match target {
        Some(explicit) => explicit.to_string(),
        None => queue::retry_target(source)
            .ok_or_else(|| RetryError::NotADeadLetterQueue(source.to_string()))?
            .to_string(),
    };

    let Some(source_counts) = channel.queue_status(source).await? else {
        return Err(RetryError::QueueNotFound(source.to_string()));
    };
    if channel.queue_status(&target).await?.is_none() {
        return Err(RetryError::TargetQueueNotFound(target));
    }

    let mut moved = 0usize;
    let mut aborted = None;

    while moved < count {
        let delivery = match channel.fetch(source).await {
            Ok(Some(delivery)) => delivery,
            Ok(None) => {
                debug!(%source, moved, requested = count, "source ran dry");
                break;
            }
            Err(err) => {
                warn!(%source, moved, error = %err, "fetch failed, aborting batch");
                aborted = Some(err.to_string());
                break;
            }
        };

        let delivery_tag = delivery.delivery_tag;
        let message = DeadLetterMessage::from(delivery);
        let patched = message.headers.reset_for_retry(Utc::now());
        let outbound = OutboundMessage {
            content_type: message.content_type,
            headers: patched.to_table(),
            body: message.body,
        };

        if let Err(err) = channel.publish(&target, outbound).await {
            // Not yet acked: the broker restores the message to the source
            // queue when the session ends. Nothing is lost.
            warn!(%source, %target, delivery_tag, error = %err, "publish failed, aborting batch");
            aborted = Some(err.to_string());
            break;
        }
        if let Err(err) = channel.ack(delivery_tag).await {
            // The copy is confirmed in the target but the original could not
            // be removed: the documented at-least-once duplicate window.
            warn!(%source, %target, delivery_tag, error = %err,
                "ack failed after confirmed publish; message may now exist in both queues");
            aborted = Some(err.to_string());
            break;
        }

        moved += 1;
        debug!(%source, %target, moved, "message moved");
    }

    Ok(RetryReport {
        source: source.to_string(),
        target,
        attempted: count,
        moved,
        remaining_in_source: source_counts.message_count.saturating_sub(moved as u32),
        aborted,
    })
}
