//! In-process broker used by the test suites.
//!
//! Models the channel semantics the administrative operations rely on:
//! FIFO queues, deliveries held out of the queue while unacknowledged,
//! requeue-at-head on reject (the real broker's redelivery position, which
//! is what makes repeated fetch+requeue show the same message again), and
//! purge reporting the discarded count. One deliberate divergence: publishing
//! to a nonexistent queue is a loud error here, where the real broker would
//! silently drop the message; a test double must not hide a lost write.

use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;

use crate::channel::{AdminChannel, Delivery, OutboundMessage, QueueCounts};
use crate::error::ChannelError;
use crate::message::HeaderTable;

#[derive(Debug, Clone)]
struct StoredMessage {
    content_type: Option<String>,
    headers: HeaderTable,
    body: Vec<u8>,
    redelivered: bool,
}

#[derive(Debug, Default)]
pub struct MemoryBroker {
    queues: BTreeMap<String, VecDeque<StoredMessage>>,
    consumers: BTreeMap<String, u32>,
    /// Deliveries fetched but not yet acked or rejected, keyed by tag.
    unacked: BTreeMap<u64, (String, StoredMessage)>,
    next_tag: u64,
    calls: u64,
    fail_after: Option<u64>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty queue.
    pub fn declare_queue(&mut self, name: &str) {
        self.queues.entry(name.to_string()).or_default();
    }

    /// Append a message to a queue, creating the queue if needed.
    pub fn seed(&mut self, queue: &str, headers: HeaderTable, body: &[u8]) {
        self.queues
            .entry(queue.to_string())
            .or_default()
            .push_back(StoredMessage {
                content_type: Some("application/json".to_string()),
                headers,
                body: body.to_vec(),
                redelivered: false,
            });
    }

    pub fn set_consumer_count(&mut self, queue: &str, count: u32) {
        self.consumers.insert(queue.to_string(), count);
    }

    /// Fail every channel call after the first `calls` have succeeded.
    /// Used to exercise mid-batch transient failures.
    pub fn fail_after_calls(&mut self, calls: u64) {
        self.fail_after = Some(calls);
    }

    /// Ready messages in a queue (excludes unacknowledged deliveries).
    pub fn message_count(&self, queue: &str) -> usize {
        self.queues.get(queue).map_or(0, VecDeque::len)
    }

    /// Deliveries currently held unacknowledged.
    pub fn unacked_count(&self) -> usize {
        self.unacked.len()
    }

    /// Snapshot of a queue's ready messages, oldest first.
    pub fn snapshot(&self, queue: &str) -> Vec<(HeaderTable, Vec<u8>)> {
        self.queues.get(queue).map_or_else(Vec::new, |q| {
            q.iter()
                .map(|m| (m.headers.clone(), m.body.clone()))
                .collect()
        })
    }

    fn tick(&mut self) -> Result<(), ChannelError> {
        self.calls += 1;
        if let Some(limit) = self.fail_after {
            if self.calls > limit {
                return Err(ChannelError::Io("injected broker fault".to_string()));
            }
        }
        Ok(())
    }

    fn queue_mut(&mut self, queue: &str) -> Result<&mut VecDeque<StoredMessage>, ChannelError> {
        self.queues
            .get_mut(queue)
            .ok_or_else(|| ChannelError::Protocol(format!("NOT_FOUND - no queue '{queue}'")))
    }
}

#[async_trait]
impl AdminChannel for MemoryBroker {
    async fn queue_status(&mut self, queue: &str) -> Result<Option<QueueCounts>, ChannelError> {
        self.tick()?;
        Ok(self.queues.get(queue).map(|q| QueueCounts {
            message_count: q.len() as u32,
            consumer_count: self.consumers.get(queue).copied().unwrap_or(0),
        }))
    }

    async fn fetch(&mut self, queue: &str) -> Result<Option<Delivery>, ChannelError> {
        self.tick()?;
        let Some(message) = self.queue_mut(queue)?.pop_front() else {
            return Ok(None);
        };
        self.next_tag += 1;
        let tag = self.next_tag;
        let delivery = Delivery {
            delivery_tag: tag,
            redelivered: message.redelivered,
            content_type: message.content_type.clone(),
            headers: message.headers.clone(),
            body: message.body.clone(),
        };
        self.unacked.insert(tag, (queue.to_string(), message));
        Ok(Some(delivery))
    }

    async fn ack(&mut self, delivery_tag: u64) -> Result<(), ChannelError> {
        self.tick()?;
        self.unacked.remove(&delivery_tag).ok_or_else(|| {
            ChannelError::Protocol(format!("unknown delivery tag {delivery_tag}"))
        })?;
        Ok(())
    }

    async fn reject_requeue(&mut self, delivery_tag: u64) -> Result<(), ChannelError> {
        self.tick()?;
        let (queue, mut message) = self.unacked.remove(&delivery_tag).ok_or_else(|| {
            ChannelError::Protocol(format!("unknown delivery tag {delivery_tag}"))
        })?;
        message.redelivered = true;
        self.queues.entry(queue).or_default().push_front(message);
        Ok(())
    }

    async fn publish(
        &mut self,
        queue: &str,
        message: OutboundMessage,
    ) -> Result<(), ChannelError> {
        self.tick()?;
        self.queue_mut(queue)?.push_back(StoredMessage {
            content_type: message.content_type,
            headers: message.headers,
            body: message.body,
            redelivered: false,
        });
        Ok(())
    }

    async fn purge(&mut self, queue: &str) -> Result<u32, ChannelError> {
        self.tick()?;
        let messages = self.queue_mut(queue)?;
        let purged = messages.len() as u32;
        messages.clear();
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_ack_removes_message() {
        let mut broker = MemoryBroker::new();
        broker.seed("q", HeaderTable::new(), b"one");

        let delivery = broker.fetch("q").await.unwrap().unwrap();
        assert_eq!(broker.message_count("q"), 0);
        assert_eq!(broker.unacked_count(), 1);

        broker.ack(delivery.delivery_tag).await.unwrap();
        assert_eq!(broker.message_count("q"), 0);
        assert_eq!(broker.unacked_count(), 0);
    }

    #[tokio::test]
    async fn reject_requeues_at_head_with_redelivered_flag() {
        let mut broker = MemoryBroker::new();
        broker.seed("q", HeaderTable::new(), b"first");
        broker.seed("q", HeaderTable::new(), b"second");

        let delivery = broker.fetch("q").await.unwrap().unwrap();
        assert_eq!(delivery.body, b"first");
        broker.reject_requeue(delivery.delivery_tag).await.unwrap();

        // Requeue lands at the head: the same message comes back first.
        let again = broker.fetch("q").await.unwrap().unwrap();
        assert_eq!(again.body, b"first");
        assert!(again.redelivered);
    }

    #[tokio::test]
    async fn fetch_from_empty_queue_is_none_not_error() {
        let mut broker = MemoryBroker::new();
        broker.declare_queue("q");
        assert!(broker.fetch("q").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_queue_is_a_protocol_error() {
        let mut broker = MemoryBroker::new();
        let err = broker.fetch("ghost").await.unwrap_err();
        assert!(matches!(err, ChannelError::Protocol(_)));
    }

    #[tokio::test]
    async fn fault_injection_trips_after_limit() {
        let mut broker = MemoryBroker::new();
        broker.declare_queue("q");
        broker.fail_after_calls(1);

        assert!(broker.queue_status("q").await.is_ok());
        assert!(matches!(
            broker.queue_status("q").await.unwrap_err(),
            ChannelError::Io(_)
        ));
    }
}
