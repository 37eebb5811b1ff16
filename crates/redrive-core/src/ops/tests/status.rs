use super::common::{pipeline_broker, seed_dead_letters};
use crate::ops::report_status;
use crate::report::QueueState;

#[tokio::test]
async fn one_entry_per_input_in_input_order() {
    let mut broker = pipeline_broker();
    seed_dead_letters(&mut broker, "ingestion_queue_dlq", 2);

    let names: Vec<String> = [
        "sync_queue_dlq",
        "no_such_queue_dlq",
        "ingestion_queue_dlq",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    let statuses = report_status(&mut broker, &names).await.unwrap();

    assert_eq!(statuses.len(), 3);
    assert_eq!(statuses[0].name, "sync_queue_dlq");
    assert_eq!(statuses[1].name, "no_such_queue_dlq");
    assert_eq!(statuses[2].name, "ingestion_queue_dlq");
}

#[tokio::test]
async fn missing_queue_marked_not_found_without_aborting_batch() {
    let mut broker = pipeline_broker();

    let names: Vec<String> = ["no_such_queue_dlq", "sync_queue_dlq"]
        .into_iter()
        .map(String::from)
        .collect();

    let statuses = report_status(&mut broker, &names).await.unwrap();

    assert_eq!(statuses[0].state, QueueState::NotFound);
    assert_eq!(
        statuses[1].state,
        QueueState::Ready {
            message_count: 0,
            consumer_count: 0
        }
    );
}

#[tokio::test]
async fn counts_reflect_depth_and_consumers() {
    let mut broker = pipeline_broker();
    seed_dead_letters(&mut broker, "ingestion_queue_dlq", 5);
    broker.set_consumer_count("ingestion_queue_dlq", 1);

    let names = vec!["ingestion_queue_dlq".to_string()];
    let statuses = report_status(&mut broker, &names).await.unwrap();

    assert_eq!(
        statuses[0].state,
        QueueState::Ready {
            message_count: 5,
            consumer_count: 1
        }
    );
}

#[tokio::test]
async fn status_consumes_nothing() {
    let mut broker = pipeline_broker();
    seed_dead_letters(&mut broker, "sync_queue_dlq", 4);

    let names = vec!["sync_queue_dlq".to_string()];
    report_status(&mut broker, &names).await.unwrap();

    assert_eq!(broker.message_count("sync_queue_dlq"), 4);
    assert_eq!(broker.unacked_count(), 0);
}
