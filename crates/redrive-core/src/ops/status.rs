use tracing::debug;

use crate::channel::AdminChannel;
use crate::error::ChannelError;
use crate::report::{QueueState, QueueStatus};

/// Passive status check over a fixed set of queue names.
///
/// Output order matches input order. A missing queue yields a `NotFound`
/// entry rather than aborting the batch; transport errors still propagate,
/// since they mean the session itself is unusable. No message is consumed or
/// altered.
pub async fn report_status<C: AdminChannel + ?Sized>(
    channel: &mut C,
    queues: &[String],
) -> Result<Vec<QueueStatus>, ChannelError> {
    let mut statuses = Vec::with_capacity(queues.len());
    for name in queues {
        let state = match channel.queue_status(name).await? {
            Some(counts) => QueueState::Ready {
                message_count: counts.message_count,
                consumer_count: counts.consumer_count,
            },
            None => QueueState::NotFound,
        };
        debug!(%name, ?state, "queue status");
        statuses.push(QueueStatus {
            name: name.clone(),
            state,
        });
    }
    Ok(statuses)
}
