//! # Order engine public API
//!
//! The `order_api` module exposes the programmatic API of the engine. Each API object is created by supplying the
//! backends it needs, so the same code runs against SQLite and Redis in production and against in-memory doubles in
//! tests.
//!
//! * [`OrderWriter`] is the write path. It decodes and normalizes inbound payloads and persists them.
//! * [`OrderReader`] is the cache-aside read path, with backfill on a miss.
//! * [`CacheWarmer`] repopulates the cache from the store at boot.
//!
//! ```rust,ignore
//! use order_engine::{MemoryOrderCache, OrderReader, OrderWriter, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/orders.db", 10).await?;
//! let cache = MemoryOrderCache::default();
//! let writer = OrderWriter::new(db.clone(), cache.clone());
//! let order = writer.ingest(payload).await?;
//! let reader = OrderReader::new(db, cache);
//! let same_order = reader.fetch_order(&order.order_uid).await?;
//! ```
pub mod errors;
mod reader;
mod warmer;
mod writer;

pub use errors::{IngestError, LookupError};
pub use reader::{OrderReader, DEFAULT_STORE_TIMEOUT};
pub use warmer::{CacheWarmer, WarmupSummary};
pub use writer::OrderWriter;
