use std::fmt::Debug;

use log::*;
use uuid::Uuid;

use super::errors::IngestError;
use crate::{
    db_types::Order,
    traits::{OrderCache, OrderStore},
};

/// `OrderWriter` is the only way new orders enter the system.
///
/// Every payload goes through the same steps:
/// 1. It is decoded. A payload that isn't a well-formed order object is rejected with [`IngestError::Validation`]
///    and the store is not touched.
/// 2. An empty `order_uid` is replaced with a fresh random UUID.
/// 3. Every sub-entity's order reference is overwritten with the root `order_uid`.
/// 4. The payment time, if supplied, is converted from epoch seconds into a UTC timestamp.
/// 5. The aggregate is upserted into the store in one transaction.
/// 6. If write-through is on (the default), the cache entry for the order is refreshed. A failure here is logged and
///    otherwise ignored.
///
/// With write-through off, an update to an order that is already cached only becomes visible to readers once the
/// old cache entry expires.
pub struct OrderWriter<B, C> {
    store: B,
    cache: C,
    write_through: bool,
}

impl<B, C> Debug for OrderWriter<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderWriter (write_through: {})", self.write_through)
    }
}

impl<B: Clone, C: Clone> Clone for OrderWriter<B, C> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), cache: self.cache.clone(), write_through: self.write_through }
    }
}

impl<B, C> OrderWriter<B, C> {
    pub fn new(store: B, cache: C) -> Self {
        Self { store, cache, write_through: true }
    }

    pub fn with_write_through(mut self, enabled: bool) -> Self {
        self.write_through = enabled;
        self
    }

    pub fn store(&self) -> &B {
        &self.store
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }
}

impl<B, C> OrderWriter<B, C>
where
    B: OrderStore,
    C: OrderCache,
{
    /// Decodes a raw JSON payload and persists the resulting order aggregate. Returns the aggregate as it was
    /// persisted, including a synthesized `order_uid` if the payload did not carry one.
    pub async fn ingest(&self, payload: &[u8]) -> Result<Order, IngestError> {
        let order = serde_json::from_slice::<Order>(payload).map_err(|e| {
            debug!("📨️ Rejecting malformed payload: {e}");
            IngestError::Validation(e.to_string())
        })?;
        self.ingest_order(order).await
    }

    /// Persists an already decoded order aggregate. See [`OrderWriter`] for the steps involved.
    pub async fn ingest_order(&self, mut order: Order) -> Result<Order, IngestError> {
        if order.order_uid.is_empty() {
            order.order_uid = Uuid::new_v4().to_string();
            debug!("📨️ Order without an identifier received. Assigned {}", order.order_uid);
        }
        order.normalize();
        if let Some(payment) = order.payment.as_mut() {
            payment.resolve_paid_at().map_err(|e| IngestError::Validation(e.to_string()))?;
        }
        self.store.upsert_order(&order).await?;
        debug!("📨️ {order} persisted");
        if self.write_through {
            if let Err(e) = self.cache.put(&order).await {
                warn!("📨️ Order {} was saved, but the cache could not be refreshed. {e}", order.order_uid);
            }
        }
        Ok(order)
    }
}
