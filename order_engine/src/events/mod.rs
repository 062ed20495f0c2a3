//! Order event stream ingestion
//!
//! [`EventIngestor`] is the long-running loop that pulls order payloads off an [`OrderEventSource`] and hands each
//! one to an [`OrderWriter`]. Delivery is at-least-once: a message is acknowledged only after it has been handled,
//! and since the write path is an idempotent upsert, a redelivered message is harmless.
//!
//! The broker-backed source lives in the server crate. This module also provides [`ChannelEventSource`], an
//! in-process source fed through an [`EventPublisher`], which is handy for tests and local tooling.
//!
//! [`OrderEventSource`]: crate::traits::OrderEventSource
//! [`OrderWriter`]: crate::OrderWriter
mod channel;
mod ingestor;

pub use channel::{event_channel, ChannelEventSource, EventPublisher, StreamCursor};
pub use ingestor::{EventIngestor, IngestSummary, IngestorState, DEFAULT_RETRY_DELAY};
