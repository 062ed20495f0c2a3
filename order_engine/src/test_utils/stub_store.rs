use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use crate::{
    db_types::Order,
    traits::{OrderStore, OrderStoreError},
};

/// An in-memory [`OrderStore`] that counts its calls and can be told to fail or to respond slowly.
#[derive(Clone, Default)]
pub struct StubStore {
    inner: Arc<StubState>,
}

#[derive(Default)]
struct StubState {
    orders: Mutex<HashMap<String, Order>>,
    upserts: AtomicUsize,
    fetches: AtomicUsize,
    fail_upserts: AtomicBool,
    fail_fetches: AtomicBool,
    failing_uids: Mutex<HashSet<String>>,
    hidden_uids: Mutex<HashSet<String>>,
    fetch_delay: Mutex<Duration>,
}

impl StubStore {
    pub fn with_orders<I: IntoIterator<Item = Order>>(orders: I) -> Self {
        let store = Self::default();
        for order in orders {
            store.insert(order);
        }
        store
    }

    /// Puts an order straight into the store, bypassing the call counters.
    pub fn insert(&self, order: Order) {
        self.inner.orders.lock().unwrap().insert(order.order_uid.clone(), order);
    }

    pub fn get(&self, order_uid: &str) -> Option<Order> {
        self.inner.orders.lock().unwrap().get(order_uid).cloned()
    }

    pub fn upsert_count(&self) -> usize {
        self.inner.upserts.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    pub fn fail_upserts(&self, fail: bool) {
        self.inner.fail_upserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.inner.fail_fetches.store(fail, Ordering::SeqCst);
    }

    /// Makes `fetch_order` fail for this identifier only. Listing is unaffected.
    pub fn fail_fetch_for(&self, order_uid: &str) {
        self.inner.failing_uids.lock().unwrap().insert(order_uid.to_string());
    }

    /// Keeps the identifier in `fetch_all_order_uids`, but `fetch_order` reports it as missing, as if it were deleted
    /// between the two calls.
    pub fn hide_from_fetches(&self, order_uid: &str) {
        self.inner.hidden_uids.lock().unwrap().insert(order_uid.to_string());
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.inner.fetch_delay.lock().unwrap() = delay;
    }
}

impl OrderStore for StubStore {
    async fn upsert_order(&self, order: &Order) -> Result<(), OrderStoreError> {
        self.inner.upserts.fetch_add(1, Ordering::SeqCst);
        if self.inner.fail_upserts.load(Ordering::SeqCst) {
            return Err(OrderStoreError::DatabaseError("stub store is refusing writes".into()));
        }
        self.insert(order.clone());
        Ok(())
    }

    async fn fetch_order(&self, order_uid: &str) -> Result<Option<Order>, OrderStoreError> {
        self.inner.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.inner.fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.inner.fail_fetches.load(Ordering::SeqCst) {
            return Err(OrderStoreError::DatabaseError("stub store is refusing reads".into()));
        }
        if self.inner.failing_uids.lock().unwrap().contains(order_uid) {
            return Err(OrderStoreError::DatabaseError(format!("stub store cannot read {order_uid}")));
        }
        if self.inner.hidden_uids.lock().unwrap().contains(order_uid) {
            return Ok(None);
        }
        Ok(self.get(order_uid))
    }

    async fn fetch_all_order_uids(&self) -> Result<Vec<String>, OrderStoreError> {
        if self.inner.fail_fetches.load(Ordering::SeqCst) {
            return Err(OrderStoreError::DatabaseError("stub store is refusing reads".into()));
        }
        let mut uids = self.inner.orders.lock().unwrap().keys().cloned().collect::<Vec<_>>();
        uids.sort();
        Ok(uids)
    }
}
