//! Order Engine
//!
//! The order engine ingests order events from a message stream, keeps a relational record of every order aggregate
//! and serves point lookups through a cache. This library contains the core logic; it knows nothing about HTTP or
//! about any particular message broker.
//!
//! The library is divided into these main sections:
//! 1. The backend contracts ([`mod@traits`]): [`OrderStore`], [`OrderCache`] and [`OrderEventSource`].
//! 2. Backend implementations. SQLite is the relational store ([`SqliteDatabase`]), and Redis ([`RedisOrderCache`])
//!    or an in-process map ([`MemoryOrderCache`]) serve as the cache.
//! 3. The public API ([`mod@order_api`]). [`OrderWriter`] is the write path, [`OrderReader`] the cache-aside read path
//!    and [`CacheWarmer`] the boot-time cache restore.
//! 4. Stream ingestion ([`mod@events`]). [`EventIngestor`] drives an [`OrderEventSource`] into an [`OrderWriter`].
//!
//! The order aggregate itself is defined in [`mod@db_types`].
mod db;

pub mod cache;
pub mod db_types;
pub mod events;
pub mod order_api;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "redis")]
pub use cache::RedisOrderCache;
pub use cache::{MemoryOrderCache, RedisCacheConfig};
#[cfg(feature = "sqlite")]
pub use db::sqlite::{db_url, new_pool, run_migrations, SqliteDatabase};
pub use events::{event_channel, ChannelEventSource, EventIngestor, EventPublisher, IngestSummary, IngestorState};
pub use order_api::{CacheWarmer, IngestError, LookupError, OrderReader, OrderWriter, WarmupSummary};
pub use traits::{CacheError, EventSourceError, OrderCache, OrderEventSource, OrderStore, OrderStoreError, StreamMessage};
