//! Queue naming convention shared by the whole pipeline: a dead-letter
//! queue is its origin queue's name with a fixed suffix appended, and each
//! origin queue pairs with a fanout dead-letter exchange.

/// Suffix appended to an origin queue's name to form its dead-letter queue.
pub const DLQ_SUFFIX: &str = "_dlq";

/// Suffix for the dead-letter exchange paired with an origin queue.
pub const DLX_SUFFIX: &str = "_dlx";

/// The dead-letter queue name for an origin queue.
pub fn dlq_name(queue: &str) -> String {
    format!("{queue}{DLQ_SUFFIX}")
}

/// The dead-letter exchange name for an origin queue.
pub fn dlx_name(queue: &str) -> String {
    format!("{queue}{DLX_SUFFIX}")
}

/// Derive the retry target (the origin queue) from a dead-letter queue name.
/// Returns `None` when the name does not carry the suffix, or when stripping
/// it would leave an empty name.
pub fn retry_target(dlq: &str) -> Option<&str> {
    dlq.strip_suffix(DLQ_SUFFIX).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_target_from_dlq_name() {
        assert_eq!(retry_target("ingestion_queue_dlq"), Some("ingestion_queue"));
        assert_eq!(retry_target("sync_queue_dlq"), Some("sync_queue"));
    }

    #[test]
    fn rejects_names_without_suffix() {
        assert_eq!(retry_target("ingestion_queue"), None);
        assert_eq!(retry_target("_dlq"), None);
        assert_eq!(retry_target(""), None);
    }

    #[test]
    fn naming_round_trips() {
        assert_eq!(retry_target(&dlq_name("orders")), Some("orders"));
        assert_eq!(dlx_name("orders"), "orders_dlx");
    }
}
