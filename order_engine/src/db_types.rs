//! The order aggregate.
//!
//! An [`Order`] together with its [`Delivery`], [`Payment`] and [`Item`]s is the unit of consistency in the engine.
//! The JSON representation of these types is exactly the payload shape carried on the inbound event stream, so the
//! same structs are used for decoding stream messages, persisting rows and caching fully materialized aggregates.
use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

//--------------------------------------        Order         ---------------------------------------------------------
/// The aggregate root.
///
/// Missing fields in an inbound payload take their zero values. The only field the engine interprets is
/// `order_uid`; `date_created` in particular is stored exactly as the producer supplied it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    pub order_uid: String,
    pub track_number: String,
    pub entry: String,
    pub delivery: Option<Delivery>,
    pub payment: Option<Payment>,
    pub items: Vec<Item>,
    pub locale: String,
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: i64,
    pub date_created: String,
    pub oof_shard: String,
}

impl Order {
    /// Overwrites the order reference of every sub-entity with this order's own identifier. Sub-entities are never
    /// trusted to report their parent correctly.
    pub fn normalize(&mut self) {
        let uid = self.order_uid.clone();
        if let Some(delivery) = self.delivery.as_mut() {
            delivery.order_uid = uid.clone();
        }
        if let Some(payment) = self.payment.as_mut() {
            payment.order_uid = uid.clone();
        }
        for item in &mut self.items {
            item.order_uid = uid.clone();
        }
    }

    /// True if every sub-entity references this order.
    pub fn is_normalized(&self) -> bool {
        let uid = self.order_uid.as_str();
        self.delivery.as_ref().map_or(true, |d| d.order_uid == uid) &&
            self.payment.as_ref().map_or(true, |p| p.order_uid == uid) &&
            self.items.iter().all(|i| i.order_uid == uid)
    }

    pub fn cache_key(&self) -> String {
        cache_key(&self.order_uid)
    }
}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Order[{}] track: {}, items: {}", self.order_uid, self.track_number, self.items.len())
    }
}

/// The key under which an order aggregate is cached.
pub fn cache_key(order_uid: &str) -> String {
    format!("order:{order_uid}")
}

//--------------------------------------       Delivery        ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(default)]
pub struct Delivery {
    pub order_uid: String,
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

//--------------------------------------        Payment        ---------------------------------------------------------
/// Payment details for an order.
///
/// Producers send the payment time as epoch seconds in `payment_dt`. The engine converts this into `paid_at`, and it
/// is `paid_at` that gets persisted. When an order is read back from the store, `payment_dt` is re-derived from
/// `paid_at` so that a cached aggregate looks the same as the one that was ingested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Payment {
    pub transaction: String,
    pub order_uid: String,
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    pub amount: i64,
    pub payment_dt: Option<i64>,
    pub paid_at: Option<DateTime<Utc>>,
    pub bank: String,
    pub delivery_cost: i64,
    pub goods_total: i64,
    pub custom_fee: i64,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Payment time {0} cannot be represented as a UTC timestamp")]
pub struct PaymentTimeError(pub i64);

impl Payment {
    /// Sets `paid_at` from the producer-supplied `payment_dt`. A payment without `payment_dt` is left with no
    /// payment time.
    pub fn resolve_paid_at(&mut self) -> Result<(), PaymentTimeError> {
        self.paid_at = match self.payment_dt {
            Some(secs) => Some(Utc.timestamp_opt(secs, 0).single().ok_or(PaymentTimeError(secs))?),
            None => None,
        };
        Ok(())
    }
}

//--------------------------------------         Item          ---------------------------------------------------------
/// A line item, keyed by the producer's catalog id (`chrt_id`). `sale` is a discount percentage and must lie in
/// `[0, 100]`; the store enforces this.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(default)]
pub struct Item {
    pub chrt_id: i64,
    pub order_uid: String,
    pub track_number: String,
    pub price: i64,
    pub rid: String,
    pub name: String,
    pub sale: i64,
    pub size: String,
    pub total_price: i64,
    pub nm_id: i64,
    pub brand: String,
    pub status: i64,
}

#[cfg(test)]
mod test {
    use super::*;

    const PAYLOAD: &str = r#"{
        "order_uid": "b563feb7b2b84b6test",
        "track_number": "WBILMTESTTRACK",
        "entry": "WBIL",
        "delivery": {"name": "Test Testov", "phone": "+9720000000", "zip": "2639809", "city": "Kiryat Mozkin",
                     "address": "Ploshad Mira 15", "region": "Kraiot", "email": "test@gmail.com"},
        "payment": {"transaction": "b563feb7b2b84b6test", "request_id": "", "currency": "USD", "provider": "wbpay",
                    "amount": 1817, "payment_dt": 1637907727, "bank": "alpha", "delivery_cost": 1500,
                    "goods_total": 317, "custom_fee": 0},
        "items": [{"chrt_id": 9934930, "track_number": "WBILMTESTTRACK", "price": 453, "rid": "ab4219087a764ae0btest",
                   "name": "Mascaras", "sale": 30, "size": "0", "total_price": 317, "nm_id": 2389212,
                   "brand": "Vivienne Sabo", "status": 202, "order_uid": "someone-else"}],
        "locale": "en",
        "internal_signature": "",
        "customer_id": "test",
        "delivery_service": "meest",
        "shardkey": "9",
        "sm_id": 99,
        "date_created": "2021-11-26T06:22:19Z",
        "oof_shard": "1"
    }"#;

    #[test]
    fn decode_payload() {
        let order: Order = serde_json::from_str(PAYLOAD).unwrap();
        assert_eq!(order.order_uid, "b563feb7b2b84b6test");
        assert_eq!(order.sm_id, 99);
        assert_eq!(order.date_created, "2021-11-26T06:22:19Z");
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].sale, 30);
        let payment = order.payment.as_ref().unwrap();
        assert_eq!(payment.payment_dt, Some(1637907727));
        assert!(payment.paid_at.is_none());
        assert!(!order.is_normalized());
    }

    #[test]
    fn missing_fields_take_zero_values() {
        let order: Order = serde_json::from_str(r#"{"track_number": "T1"}"#).unwrap();
        assert!(order.order_uid.is_empty());
        assert!(order.delivery.is_none());
        assert!(order.payment.is_none());
        assert!(order.items.is_empty());
    }

    #[test]
    fn normalize_overwrites_sub_entity_references() {
        let mut order: Order = serde_json::from_str(PAYLOAD).unwrap();
        order.order_uid = "new-uid".into();
        order.normalize();
        assert!(order.is_normalized());
        assert_eq!(order.delivery.as_ref().unwrap().order_uid, "new-uid");
        assert_eq!(order.payment.as_ref().unwrap().order_uid, "new-uid");
        assert_eq!(order.items[0].order_uid, "new-uid");
    }

    #[test]
    fn payment_time_conversion() {
        let mut payment = Payment { payment_dt: Some(1637907727), ..Default::default() };
        payment.resolve_paid_at().unwrap();
        assert_eq!(payment.paid_at, Some(Utc.with_ymd_and_hms(2021, 11, 26, 6, 22, 7).unwrap()));

        let mut payment = Payment::default();
        payment.resolve_paid_at().unwrap();
        assert!(payment.paid_at.is_none());

        let mut payment = Payment { payment_dt: Some(i64::MAX), ..Default::default() };
        assert_eq!(payment.resolve_paid_at(), Err(PaymentTimeError(i64::MAX)));
    }

    #[test]
    fn cache_keys() {
        let order = Order { order_uid: "abc".into(), ..Default::default() };
        assert_eq!(order.cache_key(), "order:abc");
    }
}
