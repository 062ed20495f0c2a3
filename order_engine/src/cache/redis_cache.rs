use std::{future::Future, sync::Arc, time::Duration};

use log::*;
use redis::{aio::ConnectionManager, Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo, RedisResult};
use tokio::{sync::RwLock, time::timeout};

use super::{decode_order, encode_order, RedisCacheConfig};
use crate::{
    db_types::{cache_key, Order},
    traits::{CacheError, OrderCache},
};

/// A Redis-backed [`OrderCache`].
///
/// Values are the JSON encoding of the aggregate, written with `SET key value EX ttl`. The connection manager
/// reconnects on its own after a connection drop; while the server is unreachable every call fails within
/// `op_timeout` with [`CacheError::Unavailable`].
#[derive(Clone)]
pub struct RedisOrderCache {
    conn: Arc<RwLock<Option<ConnectionManager>>>,
    ttl: Duration,
    op_timeout: Duration,
}

impl RedisOrderCache {
    /// Connects to the Redis server described by `config`. Failing to connect within `connect_timeout` is an error.
    pub async fn connect(config: &RedisCacheConfig) -> Result<Self, CacheError> {
        let (host, port) = config.host_and_port()?;
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(host, port),
            redis: RedisConnectionInfo {
                db: config.db,
                username: None,
                password: config.password.non_empty(),
                ..Default::default()
            },
        };
        let client = Client::open(info).map_err(|e| CacheError::Unavailable(e.to_string()))?;
        let manager = match timeout(config.connect_timeout, ConnectionManager::new(client)).await {
            Ok(Ok(manager)) => manager,
            Ok(Err(e)) => return Err(CacheError::Unavailable(format!("Could not connect to {}: {e}", config.address))),
            Err(_) => {
                return Err(CacheError::Unavailable(format!(
                    "Timed out connecting to {} after {:?}",
                    config.address, config.connect_timeout
                )))
            },
        };
        info!("⚡️ Connected to Redis cache at {}", config.address);
        Ok(Self { conn: Arc::new(RwLock::new(Some(manager))), ttl: config.ttl, op_timeout: config.op_timeout })
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        self.conn.read().await.clone().ok_or_else(|| CacheError::Unavailable("The cache connection is closed".into()))
    }

    async fn with_timeout<T, F>(&self, op: &str, fut: F) -> Result<T, CacheError>
    where F: Future<Output = RedisResult<T>> {
        match timeout(self.op_timeout, fut).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => Err(CacheError::Unavailable(format!("{op} failed: {e}"))),
            Err(_) => Err(CacheError::Unavailable(format!("{op} timed out after {:?}", self.op_timeout))),
        }
    }
}

impl OrderCache for RedisOrderCache {
    async fn get(&self, order_uid: &str) -> Result<Order, CacheError> {
        let mut conn = self.connection().await?;
        let key = cache_key(order_uid);
        let cmd = redis::cmd("GET").arg(&key).clone();
        let value = self.with_timeout("GET", cmd.query_async::<_, Option<String>>(&mut conn)).await?;
        match value {
            Some(raw) => decode_order(&raw),
            None => Err(CacheError::Miss(order_uid.to_string())),
        }
    }

    async fn put(&self, order: &Order) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let value = encode_order(order)?;
        let ttl = self.ttl.as_secs().max(1);
        let cmd = redis::cmd("SET").arg(order.cache_key()).arg(value).arg("EX").arg(ttl).clone();
        self.with_timeout("SET", cmd.query_async::<_, ()>(&mut conn)).await?;
        trace!("⚡️ Order {} cached for {ttl}s", order.order_uid);
        Ok(())
    }

    async fn close(&self) -> Result<(), CacheError> {
        if self.conn.write().await.take().is_some() {
            info!("⚡️ Redis cache connection closed");
        }
        Ok(())
    }
}
