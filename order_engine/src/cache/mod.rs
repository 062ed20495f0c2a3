//! Order cache backends.
//!
//! Both backends store the JSON encoding of the full aggregate under [`cache_key`](crate::db_types::cache_key), with
//! a fixed expiry horizon measured from the time of the `put`.
mod memory;
#[cfg(feature = "redis")]
mod redis_cache;

use std::time::Duration;

pub use memory::MemoryOrderCache;
use order_common::Secret;
#[cfg(feature = "redis")]
pub use redis_cache::RedisOrderCache;

use crate::{db_types::Order, traits::CacheError};

/// Entries expire 24 hours after they were last written.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_CACHE_OP_TIMEOUT: Duration = Duration::from_millis(250);
pub const DEFAULT_CACHE_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_REDIS_PORT: u16 = 6379;

#[derive(Clone, Debug)]
pub struct RedisCacheConfig {
    /// `host:port` of the Redis server. The port defaults to 6379 if omitted.
    pub address: String,
    pub password: Secret<String>,
    pub db: i64,
    pub ttl: Duration,
    /// Upper bound for a single cache round trip. A slower cache is reported as unavailable.
    pub op_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            address: format!("localhost:{DEFAULT_REDIS_PORT}"),
            password: Secret::default(),
            db: 0,
            ttl: DEFAULT_CACHE_TTL,
            op_timeout: DEFAULT_CACHE_OP_TIMEOUT,
            connect_timeout: DEFAULT_CACHE_CONNECT_TIMEOUT,
        }
    }
}

impl RedisCacheConfig {
    /// Splits `address` into host and port.
    pub fn host_and_port(&self) -> Result<(String, u16), CacheError> {
        let address = self.address.trim();
        match address.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|e| CacheError::Unavailable(format!("Invalid cache port in {address}: {e}")))?;
                Ok((host.to_string(), port))
            },
            None => Ok((address.to_string(), DEFAULT_REDIS_PORT)),
        }
    }
}

pub(crate) fn encode_order(order: &Order) -> Result<String, CacheError> {
    serde_json::to_string(order).map_err(|e| CacheError::Corrupt(e.to_string()))
}

pub(crate) fn decode_order(raw: &str) -> Result<Order, CacheError> {
    serde_json::from_str(raw).map_err(|e| CacheError::Corrupt(e.to_string()))
}
