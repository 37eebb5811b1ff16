use super::common::{dead_letter_headers, pipeline_broker, seed_dead_letters};
use crate::error::InspectError;
use crate::ops::inspect_queue;
use crate::report::BodyPreview;

#[tokio::test]
async fn empty_queue_yields_empty_report() {
    let mut broker = pipeline_broker();

    let report = inspect_queue(&mut broker, "ingestion_queue_dlq", 10)
        .await
        .unwrap();

    assert!(report.messages.is_empty());
    assert!(report.aborted.is_none());
}

#[tokio::test]
async fn inspection_leaves_message_count_unchanged() {
    let mut broker = pipeline_broker();
    seed_dead_letters(&mut broker, "ingestion_queue_dlq", 3);

    let report = inspect_queue(&mut broker, "ingestion_queue_dlq", 3)
        .await
        .unwrap();

    assert_eq!(report.messages.len(), 3);
    assert_eq!(broker.message_count("ingestion_queue_dlq"), 3);
    assert_eq!(broker.unacked_count(), 0);
}

#[tokio::test]
async fn positions_are_one_based_and_ordered() {
    let mut broker = pipeline_broker();
    seed_dead_letters(&mut broker, "ingestion_queue_dlq", 2);

    let report = inspect_queue(&mut broker, "ingestion_queue_dlq", 2)
        .await
        .unwrap();

    let positions: Vec<usize> = report.messages.iter().map(|m| m.position).collect();
    assert_eq!(positions, vec![1, 2]);
}

#[tokio::test]
async fn requeue_at_head_may_repeat_the_same_message() {
    // The documented limitation: requeue restores the message to the head,
    // so a sequential fetch loop sees it again instead of cycling onward.
    let mut broker = pipeline_broker();
    seed_dead_letters(&mut broker, "ingestion_queue_dlq", 2);

    let report = inspect_queue(&mut broker, "ingestion_queue_dlq", 3)
        .await
        .unwrap();

    assert_eq!(report.messages.len(), 3);
    assert_eq!(report.messages[0].message.body, report.messages[1].message.body);
    assert!(report.messages[1].message.redelivered);
    // Net count is still preserved, the only guarantee inspection makes.
    assert_eq!(broker.message_count("ingestion_queue_dlq"), 2);
}

#[tokio::test]
async fn json_bodies_are_parsed_for_preview() {
    let mut broker = pipeline_broker();
    seed_dead_letters(&mut broker, "ingestion_queue_dlq", 1);

    let report = inspect_queue(&mut broker, "ingestion_queue_dlq", 1)
        .await
        .unwrap();

    match &report.messages[0].preview {
        BodyPreview::Json(value) => assert_eq!(value["id"], 0),
        BodyPreview::Raw(_) => panic!("expected JSON preview"),
    }
}

#[tokio::test]
async fn malformed_body_is_shown_raw_not_fatal() {
    let mut broker = pipeline_broker();
    broker.seed(
        "ingestion_queue_dlq",
        dead_letter_headers(1, "unmarshal_error"),
        b"\xff\xfenot json at all",
    );
    seed_dead_letters(&mut broker, "ingestion_queue_dlq", 1);

    let report = inspect_queue(&mut broker, "ingestion_queue_dlq", 2)
        .await
        .unwrap();

    assert_eq!(report.messages.len(), 2);
    assert!(matches!(report.messages[0].preview, BodyPreview::Raw(_)));
    assert!(report.aborted.is_none());
}

#[tokio::test]
async fn headers_of_interest_are_decoded() {
    let mut broker = pipeline_broker();
    seed_dead_letters(&mut broker, "sync_queue_dlq", 1);

    let report = inspect_queue(&mut broker, "sync_queue_dlq", 1).await.unwrap();
    let headers = &report.messages[0].message.headers;

    assert_eq!(headers.retry_count, 3);
    assert_eq!(headers.dlq_reason.as_deref(), Some("max_retries_exceeded"));
    assert_eq!(headers.retry_reason.as_deref(), Some("indexing timed out"));
    assert!(headers.extra.contains_key("x-correlation-id"));
}

#[tokio::test]
async fn missing_queue_is_fatal() {
    let mut broker = pipeline_broker();

    let err = inspect_queue(&mut broker, "ghost_dlq", 5).await.unwrap_err();
    assert!(matches!(err, InspectError::QueueNotFound(name) if name == "ghost_dlq"));
}

#[tokio::test]
async fn transient_failure_keeps_partial_progress() {
    let mut broker = pipeline_broker();
    seed_dead_letters(&mut broker, "ingestion_queue_dlq", 3);
    // Calls: status, fetch, requeue; then the second fetch fails.
    broker.fail_after_calls(3);

    let report = inspect_queue(&mut broker, "ingestion_queue_dlq", 3)
        .await
        .unwrap();

    assert_eq!(report.messages.len(), 1);
    assert!(report.aborted.is_some());
}
