use thiserror::Error;

use crate::db_types::Order;

/// The `OrderCache` trait defines a key-value mirror of order aggregates.
///
/// The cache is never a source of truth. Entries expire after a fixed horizon, may disappear at any time and are
/// overwritten unconditionally. Callers in the engine treat every [`CacheError`] as a miss on `get` and log-and-ignore
/// every error on `put`.
#[allow(async_fn_in_trait)]
pub trait OrderCache: Clone {
    /// Fetches the cached aggregate. An entry either deserializes cleanly or is reported as an error; partial objects
    /// are never returned.
    async fn get(&self, order_uid: &str) -> Result<Order, CacheError>;

    /// Stores the full aggregate under its identifier, resetting the expiry horizon.
    async fn put(&self, order: &Order) -> Result<(), CacheError>;

    /// Releases the underlying connection. Calling `close` more than once is harmless.
    async fn close(&self) -> Result<(), CacheError>;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Order {0} is not in the cache")]
    Miss(String),
    #[error("The cache is unavailable: {0}")]
    Unavailable(String),
    #[error("The cache entry could not be decoded: {0}")]
    Corrupt(String),
}

impl CacheError {
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::Miss(_))
    }
}
