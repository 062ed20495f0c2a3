use order_engine::{
    db_types::Order,
    test_utils::{
        fixtures::{sample_item, sample_order},
        prepare_env::{prepare_test_env, random_db_path},
    },
    OrderStore,
    OrderStoreError,
    SqliteDatabase,
};

async fn new_store() -> SqliteDatabase {
    prepare_test_env(&random_db_path()).await
}

#[tokio::test]
async fn round_trip() {
    let db = new_store().await;
    let order = sample_order("rt-1", "TRACK-RT-1");
    db.upsert_order(&order).await.unwrap();
    let stored = db.fetch_order("rt-1").await.unwrap().expect("order should exist");
    assert_eq!(stored, order);
    assert!(stored.is_normalized());
}

#[tokio::test]
async fn missing_order() {
    let db = new_store().await;
    assert_eq!(db.fetch_order("nope").await.unwrap(), None);
}

#[tokio::test]
async fn upsert_replaces_sub_entities() {
    let db = new_store().await;
    let order = sample_order("idem-1", "TRACK-IDEM-1");
    assert_eq!(order.items.len(), 2);
    db.upsert_order(&order).await.unwrap();
    assert_eq!(db.item_count("idem-1").await.unwrap(), 2);

    let mut smaller = order.clone();
    smaller.items.truncate(1);
    smaller.locale = "ru".into();
    smaller.delivery = None;
    db.upsert_order(&smaller).await.unwrap();
    assert_eq!(db.item_count("idem-1").await.unwrap(), 1);
    let stored = db.fetch_order("idem-1").await.unwrap().unwrap();
    assert_eq!(stored, smaller);
    assert_eq!(db.fetch_all_order_uids().await.unwrap(), vec!["idem-1".to_string()]);

    // Replaying the same version changes nothing
    db.upsert_order(&smaller).await.unwrap();
    assert_eq!(db.fetch_order("idem-1").await.unwrap().unwrap(), smaller);
    assert_eq!(db.item_count("idem-1").await.unwrap(), 1);
}

#[tokio::test]
async fn order_without_sub_entities() {
    let db = new_store().await;
    let order = Order { order_uid: "bare".into(), track_number: "TRACK-BARE".into(), ..Default::default() };
    db.upsert_order(&order).await.unwrap();
    assert_eq!(db.fetch_order("bare").await.unwrap().unwrap(), order);
}

#[tokio::test]
async fn sale_must_be_a_percentage() {
    let db = new_store().await;
    let mut order = sample_order("sale-1", "TRACK-SALE-1");
    order.items[0].sale = 150;
    let err = db.upsert_order(&order).await.unwrap_err();
    assert!(matches!(err, OrderStoreError::ConstraintViolation(_)), "unexpected error: {err}");
    // Nothing from the rejected aggregate was written
    assert_eq!(db.fetch_order("sale-1").await.unwrap(), None);
    assert_eq!(db.item_count("sale-1").await.unwrap(), 0);

    order.items[0].sale = 100;
    order.items[1].sale = 0;
    db.upsert_order(&order).await.unwrap();
    let stored = db.fetch_order("sale-1").await.unwrap().unwrap();
    assert_eq!(stored.items[0].sale, 100);
    assert_eq!(stored.items[1].sale, 0);
}

#[tokio::test]
async fn items_cannot_move_between_orders() {
    let db = new_store().await;
    let first = sample_order("owner-1", "TRACK-OWNER-1");
    db.upsert_order(&first).await.unwrap();
    let mut second = sample_order("owner-2", "TRACK-OWNER-2");
    let mut stolen = sample_item(first.items[0].chrt_id, "TRACK-OWNER-2", 10);
    stolen.order_uid = "owner-2".into();
    second.items.push(stolen);
    let err = db.upsert_order(&second).await.unwrap_err();
    assert!(matches!(err, OrderStoreError::ConstraintViolation(_)), "unexpected error: {err}");
    assert_eq!(db.fetch_order("owner-1").await.unwrap().unwrap(), first);
    assert_eq!(db.fetch_order("owner-2").await.unwrap(), None);
}

#[tokio::test]
async fn all_order_uids_oldest_first() {
    let db = new_store().await;
    for (uid, track) in [("c", "TRACK-C"), ("a", "TRACK-A"), ("b", "TRACK-B")] {
        db.upsert_order(&sample_order(uid, track)).await.unwrap();
    }
    // An update doesn't move an order to the back
    db.upsert_order(&sample_order("c", "TRACK-C")).await.unwrap();
    let uids = db.fetch_all_order_uids().await.unwrap();
    assert_eq!(uids, vec!["c", "a", "b"]);
}

#[tokio::test]
async fn concurrent_upserts_of_the_same_order() {
    let db = new_store().await;
    let order = sample_order("race-1", "TRACK-RACE-1");
    let tasks = (0..8).map(|_| {
        let db = db.clone();
        let order = order.clone();
        async move { db.upsert_order(&order).await }
    });
    let results = futures_util::future::join_all(tasks).await;
    // SQLite serializes writers. Some may report a busy database, but none may leave a partial aggregate.
    assert!(results.iter().any(|r| r.is_ok()));
    assert_eq!(db.fetch_order("race-1").await.unwrap().unwrap(), order);
    assert_eq!(db.item_count("race-1").await.unwrap(), 2);
}
