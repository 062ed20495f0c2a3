//! Realistic order aggregates for tests.
use crate::db_types::{Delivery, Item, Order, Payment};

pub const PAYMENT_DT: i64 = 1637907727;

/// A fully populated, normalized order with a delivery, a payment and two items, in the shape the store hands it
/// back. Item ids are derived from `track_number` so that fixtures with distinct track numbers don't share a
/// `chrt_id`.
pub fn sample_order(order_uid: &str, track_number: &str) -> Order {
    let base = chrt_base(track_number);
    let mut order = Order {
        order_uid: order_uid.to_string(),
        track_number: track_number.to_string(),
        entry: "WBIL".into(),
        delivery: Some(Delivery {
            order_uid: order_uid.to_string(),
            name: "Test Testov".into(),
            phone: "+9720000000".into(),
            zip: "2639809".into(),
            city: "Kiryat Mozkin".into(),
            address: "Ploshad Mira 15".into(),
            region: "Kraiot".into(),
            email: "test@gmail.com".into(),
        }),
        payment: Some(Payment {
            transaction: format!("tx-{track_number}"),
            order_uid: order_uid.to_string(),
            currency: "USD".into(),
            provider: "wbpay".into(),
            amount: 1817,
            payment_dt: Some(PAYMENT_DT),
            bank: "alpha".into(),
            delivery_cost: 1500,
            goods_total: 317,
            ..Default::default()
        }),
        items: vec![sample_item(base, track_number, 30), sample_item(base + 1, track_number, 0)],
        locale: "en".into(),
        customer_id: "test".into(),
        delivery_service: "meest".into(),
        shardkey: "9".into(),
        sm_id: 99,
        date_created: "2021-11-26T06:22:19Z".into(),
        oof_shard: "1".into(),
        ..Default::default()
    };
    order.normalize();
    if let Some(payment) = order.payment.as_mut() {
        payment.resolve_paid_at().expect("fixture payment time is valid");
    }
    order
}

pub fn sample_item(chrt_id: i64, track_number: &str, sale: i64) -> Item {
    Item {
        chrt_id,
        track_number: track_number.to_string(),
        price: 453,
        rid: format!("rid-{chrt_id}"),
        name: "Mascaras".into(),
        sale,
        size: "0".into(),
        total_price: 317,
        nm_id: 2389212,
        brand: "Vivienne Sabo".into(),
        status: 202,
        ..Default::default()
    }
}

/// The JSON payload a producer would publish for [`sample_order`].
pub fn sample_payload(order_uid: &str, track_number: &str) -> String {
    let mut order = sample_order(order_uid, track_number);
    if let Some(payment) = order.payment.as_mut() {
        payment.paid_at = None;
    }
    serde_json::to_string(&order).expect("fixture orders always serialize")
}

fn chrt_base(track_number: &str) -> i64 {
    let hash = track_number.bytes().fold(17i64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as i64));
    (hash.rem_euclid(1_000_000_000)) * 10
}
