use std::time::Duration;

use log::*;
use order_engine::IngestSummary;
#[cfg(feature = "kafka")]
use order_engine::{EventIngestor, OrderWriter, RedisOrderCache, SqliteDatabase};
use tokio::task::JoinHandle;
#[cfg(feature = "kafka")]
use tokio_util::sync::CancellationToken;

#[cfg(feature = "kafka")]
use crate::kafka::KafkaEventSource;

/// How long the server waits for the ingest worker to finish the message in hand after shutdown is requested.
pub const INGESTOR_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Starts the order ingest worker. It runs until `shutdown` is cancelled, so only await the returned JoinHandle after
/// cancelling the token.
#[cfg(feature = "kafka")]
pub fn start_order_ingestor(
    source: KafkaEventSource,
    writer: OrderWriter<SqliteDatabase, RedisOrderCache>,
    shutdown: CancellationToken,
) -> JoinHandle<IngestSummary> {
    let ingestor = EventIngestor::new(source, writer);
    let mut state = ingestor.subscribe_state();
    tokio::spawn(async move {
        while state.changed().await.is_ok() {
            trace!("📨️ Order ingestor is now {}", *state.borrow());
        }
    });
    tokio::spawn(ingestor.run(shutdown))
}

/// Waits up to `grace` for the worker to wind down.
pub async fn join_order_ingestor(worker: JoinHandle<IngestSummary>, grace: Duration) {
    match tokio::time::timeout(grace, worker).await {
        Ok(Ok(summary)) => info!("📨️ Order ingestor stopped. {summary}"),
        Ok(Err(e)) => error!("📨️ Order ingestor task failed. {e}"),
        Err(_) => warn!("📨️ Order ingestor did not stop within {grace:?}. Abandoning it."),
    }
}
