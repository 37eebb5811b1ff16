/// Infrastructure errors from the broker channel. This is the error type for
/// the `AdminChannel` trait: channel operations can only fail with transport
/// or protocol errors; queue existence is modeled in the return types.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("broker i/o error: {0}")]
    Io(String),

    #[error("broker protocol error: {0}")]
    Protocol(String),
}

/// Errors from inspecting a dead-letter queue.
#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    #[error("queue not found: {0}")]
    QueueNotFound(String),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Errors from moving messages out of a dead-letter queue.
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    #[error("queue not found: {0}")]
    QueueNotFound(String),

    #[error("target queue not found: {0}")]
    TargetQueueNotFound(String),

    #[error("{0} does not carry the dead-letter suffix; pass an explicit target queue")]
    NotADeadLetterQueue(String),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Errors from purging a queue. A rejected confirmation is not an error;
/// it is a reported cancellation, see `PurgeOutcome`.
#[derive(Debug, thiserror::Error)]
pub enum PurgeError {
    #[error("queue not found: {0}")]
    QueueNotFound(String),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}
