use tracing::info;

use crate::channel::AdminChannel;
use crate::error::PurgeError;
use crate::report::PurgeOutcome;

/// The literal an operator must type to authorize a purge. Nothing shorter,
/// no default, no empty string. An unattended script cannot satisfy it.
pub const PURGE_CONFIRMATION: &str = "YES";

/// Irreversibly empty a queue, gated on an exact confirmation token.
///
/// Any non-matching token cancels with no side effect and reports
/// `purged: false`; that is a cancellation, not a failure. On confirmation
/// the queue is purged atomically and the number of discarded messages is
/// reported.
pub async fn purge_queue<C: AdminChannel + ?Sized>(
    channel: &mut C,
    queue: &str,
    confirmation: &str,
) -> Result<PurgeOutcome, PurgeError> {
    let Some(counts) = channel.queue_status(queue).await? else {
        return Err(PurgeError::QueueNotFound(queue.to_string()));
    };

    if confirmation != PURGE_CONFIRMATION {
        info!(%queue, "purge cancelled, confirmation not given");
        return Ok(PurgeOutcome {
            purged: false,
            previous_count: counts.message_count,
        });
    }

    let purged = channel.purge(queue).await?;
    info!(%queue, purged, "queue purged");
    Ok(PurgeOutcome {
        purged: true,
        previous_count: purged,
    })
}
