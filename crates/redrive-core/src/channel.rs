use async_trait::async_trait;

use crate::error::ChannelError;
use crate::message::HeaderTable;

/// One delivery handed out by the broker, before any interpretation.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub delivery_tag: u64,
    pub redelivered: bool,
    pub content_type: Option<String>,
    pub headers: HeaderTable,
    pub body: Vec<u8>,
}

/// A message to publish. Administrative republishes are always marked for
/// durable delivery by the channel implementation.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub content_type: Option<String>,
    pub headers: HeaderTable,
    pub body: Vec<u8>,
}

/// Passive-check snapshot of a queue. Reflects broker state at query time
/// and may be stale by the time it is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueCounts {
    pub message_count: u32,
    pub consumer_count: u32,
}

/// The sequential broker channel the administrative operations run against.
///
/// Every method takes `&mut self`: a broker channel is not safe for
/// concurrent use from multiple logical operations, so the ordering of
/// fetch/ack/reject/publish calls is enforced by exclusive access rather
/// than by convention. Implementations: `AmqpChannel` (real broker) and
/// [`MemoryBroker`](crate::memory::MemoryBroker) (tests).
#[async_trait]
pub trait AdminChannel: Send {
    /// Passive existence check. `Ok(None)` means the queue does not exist;
    /// the queue is never created as a side effect.
    async fn queue_status(&mut self, queue: &str) -> Result<Option<QueueCounts>, ChannelError>;

    /// Fetch a single message without pre-acknowledgement. `Ok(None)` means
    /// the queue is currently empty; absence of a message is a valid,
    /// immediately-observable outcome, not a blocking wait.
    async fn fetch(&mut self, queue: &str) -> Result<Option<Delivery>, ChannelError>;

    /// Permanently remove a fetched message.
    async fn ack(&mut self, delivery_tag: u64) -> Result<(), ChannelError>;

    /// Return a fetched message to its queue for future delivery. The broker
    /// re-places it at the head, not the tail.
    async fn reject_requeue(&mut self, delivery_tag: u64) -> Result<(), ChannelError>;

    /// Publish a durable message to the named queue, returning only once the
    /// broker has confirmed it.
    async fn publish(&mut self, queue: &str, message: OutboundMessage)
        -> Result<(), ChannelError>;

    /// Discard every message currently in the queue, returning how many
    /// were discarded.
    async fn purge(&mut self, queue: &str) -> Result<u32, ChannelError>;
}
