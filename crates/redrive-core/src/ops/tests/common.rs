use crate::memory::MemoryBroker;
use crate::message::{header, HeaderTable, HeaderValue};

/// A broker with the pipeline's queues declared and empty.
pub(super) fn pipeline_broker() -> MemoryBroker {
    let mut broker = MemoryBroker::new();
    broker.declare_queue("ingestion_queue");
    broker.declare_queue("ingestion_queue_dlq");
    broker.declare_queue("sync_queue");
    broker.declare_queue("sync_queue_dlq");
    broker
}

/// Headers the way the pipeline workers stamp them when dead-lettering.
pub(super) fn dead_letter_headers(retry_count: i64, dlq_reason: &str) -> HeaderTable {
    let mut headers = HeaderTable::new();
    headers.insert(
        header::RETRY_COUNT.to_string(),
        HeaderValue::Int(retry_count),
    );
    headers.insert(
        header::RETRY_REASON.to_string(),
        HeaderValue::Str("indexing timed out".to_string()),
    );
    headers.insert(
        header::DLQ_REASON.to_string(),
        HeaderValue::Str(dlq_reason.to_string()),
    );
    headers.insert(
        "x-correlation-id".to_string(),
        HeaderValue::Str("corr-42".to_string()),
    );
    headers
}

/// Seed `n` dead-lettered JSON messages into a queue.
pub(super) fn seed_dead_letters(broker: &mut MemoryBroker, queue: &str, n: usize) {
    for i in 0..n {
        let body = format!(r#"{{"id":{i},"title":"news item {i}"}}"#);
        broker.seed(
            queue,
            dead_letter_headers(3, "max_retries_exceeded"),
            body.as_bytes(),
        );
    }
}
