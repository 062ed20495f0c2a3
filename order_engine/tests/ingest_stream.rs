use std::time::Duration;

use order_engine::{
    event_channel,
    test_utils::{
        fixtures::{sample_order, sample_payload},
        prepare_env::{prepare_test_env, random_db_path},
    },
    EventIngestor,
    IngestSummary,
    IngestorState,
    MemoryOrderCache,
    OrderReader,
    OrderStore,
    OrderWriter,
};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn stream_to_store_to_reader() {
    let db = prepare_test_env(&random_db_path()).await;
    let cache = MemoryOrderCache::default();
    let (publisher, source) = event_channel("orders", 32);
    let cursor = publisher.cursor();
    let writer = OrderWriter::new(db.clone(), cache.clone());
    let ingestor = EventIngestor::new(source, writer);

    publisher.publish_keyed("s-1", sample_payload("s-1", "TRACK-S-1")).await;
    publisher.publish("{ definitely not an order").await;
    // A redelivery of the first message
    publisher.publish_keyed("s-1", sample_payload("s-1", "TRACK-S-1")).await;
    publisher.publish_keyed("s-2", sample_payload("s-2", "TRACK-S-2")).await;
    drop(publisher);

    let summary = ingestor.run(CancellationToken::new()).await;
    assert_eq!(summary, IngestSummary { processed: 3, failed: 1, read_errors: 0 });
    assert_eq!(cursor.committed_offset(), Some(3));
    assert_eq!(db.fetch_all_order_uids().await.unwrap(), vec!["s-1", "s-2"]);
    assert_eq!(db.item_count("s-1").await.unwrap(), 2);

    let reader = OrderReader::new(db.clone(), cache);
    assert_eq!(reader.get_order("s-2").await.unwrap(), Some(sample_order("s-2", "TRACK-S-2")));
}

#[tokio::test]
async fn constraint_violations_are_skipped() {
    let db = prepare_test_env(&random_db_path()).await;
    let (publisher, source) = event_channel("orders", 8);
    let ingestor = EventIngestor::new(source, OrderWriter::new(db.clone(), MemoryOrderCache::default()));

    let mut bad = sample_order("bad-1", "TRACK-BAD-1");
    bad.items[0].sale = 150;
    bad.payment.as_mut().unwrap().paid_at = None;
    publisher.publish(serde_json::to_vec(&bad).unwrap()).await;
    publisher.publish(sample_payload("good-1", "TRACK-GOOD-1")).await;
    drop(publisher);

    let summary = ingestor.run(CancellationToken::new()).await;
    assert_eq!(summary, IngestSummary { processed: 1, failed: 1, read_errors: 0 });
    assert_eq!(db.fetch_order("bad-1").await.unwrap(), None);
    assert!(db.fetch_order("good-1").await.unwrap().is_some());
}

#[tokio::test]
async fn shutdown_while_the_stream_is_live() {
    let db = prepare_test_env(&random_db_path()).await;
    let (publisher, source) = event_channel("orders", 8);
    let ingestor = EventIngestor::new(source, OrderWriter::new(db.clone(), MemoryOrderCache::default()))
        .with_retry_delay(Duration::from_millis(20));
    let mut state = ingestor.subscribe_state();
    let token = CancellationToken::new();
    let handle = tokio::spawn(ingestor.run(token.clone()));

    publisher.publish(sample_payload("live-1", "TRACK-LIVE-1")).await;
    publisher.publish_error("connection reset").await;
    publisher.publish(sample_payload("live-2", "TRACK-LIVE-2")).await;
    let cursor = publisher.cursor();
    tokio::time::timeout(Duration::from_secs(10), async {
        while cursor.committed_offset() != Some(1) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("both orders should be ingested");
    state.wait_for(|s| *s == IngestorState::Polling).await.unwrap();

    token.cancel();
    let summary = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    assert_eq!(summary, IngestSummary { processed: 2, failed: 0, read_errors: 1 });
    assert_eq!(*state.borrow(), IngestorState::Closed);
    assert_eq!(db.fetch_all_order_uids().await.unwrap(), vec!["live-1", "live-2"]);
}
