//! # Storage, cache and stream contracts.
//!
//! The engine is written against three capability sets so that the write and read paths can run on a real backend
//! or on an in-process test double without any change:
//!
//! * [`OrderStore`] is the authoritative, transactional home of order aggregates.
//! * [`OrderCache`] is a best-effort key-value mirror of fully materialized aggregates with a fixed expiry horizon.
//!   Any cache error is treated as a miss by the engine.
//! * [`OrderEventSource`] is an at-least-once stream of order payloads.
mod event_source;
mod order_cache;
mod order_store;

pub use event_source::{EventSourceError, OrderEventSource, StreamMessage};
pub use order_cache::{CacheError, OrderCache};
pub use order_store::{OrderStore, OrderStoreError};
