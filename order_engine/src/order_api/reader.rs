use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, Mutex},
    time::Duration,
};

use log::*;
use tokio::{sync::OnceCell, time::timeout};

use super::errors::LookupError;
use crate::{
    db_types::Order,
    traits::{CacheError, OrderCache, OrderStore},
};

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

type Flight = Arc<OnceCell<Result<Order, LookupError>>>;

/// `OrderReader` serves point lookups through the cache.
///
/// A cache hit is returned without touching the store. On a miss, or if the cache is unreachable, the store is read
/// and the cache is backfilled on a best-effort basis. An order that is not in the store is reported as
/// [`LookupError::NotFound`] and nothing is written to the cache.
///
/// Concurrent misses for the same order are coalesced: the first caller reads the store and backfills the cache,
/// and everyone else who missed while that read was in flight receives a copy of its result.
pub struct OrderReader<B, C> {
    store: B,
    cache: C,
    store_timeout: Duration,
    flights: Arc<Mutex<HashMap<String, Flight>>>,
}

impl<B, C> Debug for OrderReader<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderReader (store timeout: {:?})", self.store_timeout)
    }
}

impl<B: Clone, C: Clone> Clone for OrderReader<B, C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
            store_timeout: self.store_timeout,
            flights: Arc::clone(&self.flights),
        }
    }
}

impl<B, C> OrderReader<B, C> {
    pub fn new(store: B, cache: C) -> Self {
        Self { store, cache, store_timeout: DEFAULT_STORE_TIMEOUT, flights: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    pub fn store(&self) -> &B {
        &self.store
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    fn join_flight<'a>(&'a self, order_uid: &'a str) -> Boarding<'a> {
        let mut flights = self.flights.lock().unwrap_or_else(|e| e.into_inner());
        let flight = flights.entry(order_uid.to_string()).or_insert_with(|| Arc::new(OnceCell::new())).clone();
        Boarding { flights: &self.flights, order_uid, flight }
    }
}

/// A caller's seat on an in-flight store read. Dropping it, whether the read landed or the caller was cancelled,
/// removes the map entry once nobody else is waiting on it.
struct Boarding<'a> {
    flights: &'a Mutex<HashMap<String, Flight>>,
    order_uid: &'a str,
    flight: Flight,
}

impl Drop for Boarding<'_> {
    fn drop(&mut self) {
        let mut flights = self.flights.lock().unwrap_or_else(|e| e.into_inner());
        let Some(current) = flights.get(self.order_uid) else {
            return;
        };
        if !Arc::ptr_eq(current, &self.flight) {
            return;
        }
        // One reference is held by the map and one by this seat
        if self.flight.initialized() || Arc::strong_count(&self.flight) <= 2 {
            flights.remove(self.order_uid);
        }
    }
}

impl<B, C> OrderReader<B, C>
where
    B: OrderStore,
    C: OrderCache,
{
    /// Fetches the order aggregate with the given identifier.
    pub async fn fetch_order(&self, order_uid: &str) -> Result<Order, LookupError> {
        match self.cache.get(order_uid).await {
            Ok(order) => {
                trace!("🔎️ Cache hit for order {order_uid}");
                return Ok(order);
            },
            Err(CacheError::Miss(_)) => trace!("🔎️ Cache miss for order {order_uid}"),
            Err(e) => warn!("🔎️ Cache lookup for order {order_uid} failed, falling back to the store. {e}"),
        }
        let boarding = self.join_flight(order_uid);
        let result = boarding.flight.get_or_init(|| self.load_and_backfill(order_uid)).await.clone();
        result
    }

    /// The lookup as seen by the HTTP layer: `Ok(None)` when the order does not exist, an error for anything else
    /// that went wrong.
    pub async fn get_order(&self, order_uid: &str) -> Result<Option<Order>, LookupError> {
        match self.fetch_order(order_uid).await {
            Ok(order) => Ok(Some(order)),
            Err(LookupError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn load_and_backfill(&self, order_uid: &str) -> Result<Order, LookupError> {
        let order = match timeout(self.store_timeout, self.store.fetch_order(order_uid)).await {
            Ok(Ok(Some(order))) => order,
            Ok(Ok(None)) => {
                debug!("🔎️ Order {order_uid} does not exist");
                return Err(LookupError::NotFound(order_uid.to_string()));
            },
            Ok(Err(e)) => {
                error!("🔎️ Could not read order {order_uid} from the store. {e}");
                return Err(e.into());
            },
            Err(_) => {
                error!("🔎️ Reading order {order_uid} from the store timed out after {:?}", self.store_timeout);
                return Err(LookupError::Timeout(self.store_timeout));
            },
        };
        if let Err(e) = self.cache.put(&order).await {
            warn!("🔎️ Could not backfill the cache for order {order_uid}. {e}");
        }
        Ok(order)
    }
}
