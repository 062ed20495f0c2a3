//! # Order server
//! This crate hosts the service around the order engine. It is responsible for:
//! Consuming order events from Kafka and persisting them through the engine's write path.
//! Restoring the order cache from the database at boot.
//! Serving order lookups over HTTP.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `GET /order/{order_uid}`: Fetches a full order aggregate.
//! * `POST /orders`: Ingests an order payload directly, bypassing the event stream.

pub mod cli;
pub mod config;
pub mod errors;
pub mod ingest_worker;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
