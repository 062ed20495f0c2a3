use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use log::*;
use tokio::{sync::RwLock, time::Instant};

use super::{decode_order, encode_order, DEFAULT_CACHE_TTL};
use crate::{
    db_types::{cache_key, Order},
    traits::{CacheError, OrderCache},
};

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// An in-process [`OrderCache`] with per-entry expiry.
///
/// Clones share the same entries. Expired entries are dropped lazily, on the next `get` for their key or on
/// [`purge_expired`](MemoryOrderCache::purge_expired). An outage can be simulated with
/// [`set_available`](MemoryOrderCache::set_available), in which case every call fails with
/// [`CacheError::Unavailable`]. The same goes for every call after [`close`](OrderCache::close).
#[derive(Clone)]
pub struct MemoryOrderCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
    available: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl Default for MemoryOrderCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl MemoryOrderCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            available: Arc::new(AtomicBool::new(true)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// The number of stored entries, including expired ones that have not been purged yet.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, order_uid: &str) -> bool {
        let now = Instant::now();
        self.entries.read().await.get(&cache_key(order_uid)).is_some_and(|e| e.expires_at > now)
    }

    /// Drops every expired entry and returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }

    fn check_available(&self) -> Result<(), CacheError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("memory cache is closed".into()));
        }
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::Unavailable("memory cache is offline".into()))
        }
    }
}

impl OrderCache for MemoryOrderCache {
    async fn get(&self, order_uid: &str) -> Result<Order, CacheError> {
        self.check_available()?;
        let key = cache_key(order_uid);
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some(entry) if entry.expires_at > now => return decode_order(&entry.value),
                Some(_) => {},
                None => return Err(CacheError::Miss(order_uid.to_string())),
            }
        }
        trace!("⚡️ Cache entry {key} has expired");
        let mut entries = self.entries.write().await;
        if entries.get(&key).is_some_and(|e| e.expires_at <= now) {
            entries.remove(&key);
        }
        Err(CacheError::Miss(order_uid.to_string()))
    }

    async fn put(&self, order: &Order) -> Result<(), CacheError> {
        self.check_available()?;
        let value = encode_order(order)?;
        let entry = CacheEntry { value, expires_at: Instant::now() + self.ttl };
        self.entries.write().await.insert(order.cache_key(), entry);
        trace!("⚡️ Order {} cached for {:?}", order.order_uid, self.ttl);
        Ok(())
    }

    async fn close(&self) -> Result<(), CacheError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.entries.write().await.clear();
            debug!("⚡️ Memory cache closed");
        }
        Ok(())
    }
}
