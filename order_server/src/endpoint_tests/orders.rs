use actix_web::{http::StatusCode, test, test::TestRequest, App};
use order_engine::{db_types::Order, test_utils::fixtures::sample_order, MemoryOrderCache, OrderStoreError};
use serde_json::Value;

use super::{
    helpers::{configure_orders, get_request, into_parts, post_request},
    mocks::MockStore,
};

fn idle_store() -> MockStore {
    let mut store = MockStore::new();
    store.expect_fetch_order().never();
    store.expect_upsert_order().never();
    store
}

fn error_message(body: &str) -> String {
    let json: Value = serde_json::from_str(body).expect("error responses are JSON");
    json["error"].as_str().expect("error responses have an error field").to_string()
}

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        get_request("/health", configure_orders(idle_store(), idle_store(), MemoryOrderCache::default())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn fetch_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_fetch_order()
        .withf(|uid| uid == "b563feb7b2b84b6test")
        .times(1)
        .returning(|_| Ok(Some(sample_order("b563feb7b2b84b6test", "WBILMTESTTRACK"))));
    let (status, body) = get_request(
        "/order/b563feb7b2b84b6test",
        configure_orders(store, idle_store(), MemoryOrderCache::default()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let order: Order = serde_json::from_str(&body).unwrap();
    assert_eq!(order, sample_order("b563feb7b2b84b6test", "WBILMTESTTRACK"));
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["payment"]["payment_dt"], 1637907727);
    assert_eq!(json["items"].as_array().map(Vec::len), Some(2));
}

#[actix_web::test]
async fn second_fetch_is_served_from_the_cache() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order().times(1).returning(|uid| Ok(Some(sample_order(uid, "TRACK-1"))));
    let cache = MemoryOrderCache::default();
    let app = App::new().configure(configure_orders(store, idle_store(), cache.clone()));
    let service = test::init_service(app).await;
    for _ in 0..3 {
        let res = test::call_service(&service, TestRequest::get().uri("/order/o-1").to_request()).await;
        let (status, _) = into_parts(res).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert!(cache.contains("o-1").await);
}

#[actix_web::test]
async fn fetch_missing_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order().times(1).returning(|_| Ok(None));
    let cache = MemoryOrderCache::default();
    let (status, body) = get_request("/order/nope", configure_orders(store, idle_store(), cache.clone())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_message(&body), "The data was not found. Order nope does not exist");
    assert!(cache.is_empty().await);
}

#[actix_web::test]
async fn fetch_with_blank_id() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        get_request("/order/", configure_orders(idle_store(), idle_store(), MemoryOrderCache::default())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Could not read request path: order_uid must not be empty");
}

#[actix_web::test]
async fn fetch_when_the_store_is_down() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order().returning(|_| Err(OrderStoreError::DatabaseError("disk on fire".into())));
    let (status, body) =
        get_request("/order/o-1", configure_orders(store, idle_store(), MemoryOrderCache::default())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(error_message(&body).contains("disk on fire"));
}

#[actix_web::test]
async fn fetch_when_the_cache_is_down() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_order().times(2).returning(|uid| Ok(Some(sample_order(uid, "TRACK-1"))));
    let cache = MemoryOrderCache::default();
    cache.set_available(false);
    let app = App::new().configure(configure_orders(store, idle_store(), cache));
    let service = test::init_service(app).await;
    for _ in 0..2 {
        let res = test::call_service(&service, TestRequest::get().uri("/order/o-1").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
    }
}

#[actix_web::test]
async fn ingest_order() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_upsert_order()
        .withf(|order| {
            order.order_uid == "o-7" && order.is_normalized() && order.payment.as_ref().is_some_and(|p| p.paid_at.is_some())
        })
        .times(1)
        .returning(|_| Ok(()));
    let cache = MemoryOrderCache::default();
    let payload = order_engine::test_utils::fixtures::sample_payload("o-7", "TRACK-7");
    let (status, body) = post_request("/orders", &payload, configure_orders(idle_store(), store, cache.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, r#"{"order_uid":"o-7"}"#);
    assert!(cache.contains("o-7").await);
}

#[actix_web::test]
async fn ingest_order_without_an_id() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_upsert_order().withf(|order| !order.order_uid.is_empty()).times(1).returning(|_| Ok(()));
    let (status, body) = post_request(
        "/orders",
        r#"{"track_number": "TRACK-ANON", "items": [{"chrt_id": 1}]}"#,
        configure_orders(idle_store(), store, MemoryOrderCache::default()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["order_uid"].as_str().map(str::len), Some(36));
}

#[actix_web::test]
async fn ingest_malformed_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(
        "/orders",
        r#"{"order_uid": "o-8", "items": "lots"}"#,
        configure_orders(idle_store(), idle_store(), MemoryOrderCache::default()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).starts_with("Could not read request body: Malformed order payload"));
}

#[actix_web::test]
async fn ingest_order_rejected_by_the_store() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_upsert_order()
        .times(1)
        .returning(|_| Err(OrderStoreError::ConstraintViolation("CHECK constraint failed: sale".into())));
    let payload = order_engine::test_utils::fixtures::sample_payload("o-9", "TRACK-9");
    let (status, _) =
        post_request("/orders", &payload, configure_orders(idle_store(), store, MemoryOrderCache::default())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut store = MockStore::new();
    store
        .expect_upsert_order()
        .times(1)
        .returning(|_| Err(OrderStoreError::DatabaseError("database is locked".into())));
    let (status, body) =
        post_request("/orders", &payload, configure_orders(idle_store(), store, MemoryOrderCache::default())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(error_message(&body).contains("database is locked"));
}
