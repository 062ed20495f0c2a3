use std::{fmt::Display, time::Duration};

use log::*;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    order_api::{IngestError, OrderWriter},
    traits::{EventSourceError, OrderCache, OrderEventSource, OrderStore, StreamMessage},
};

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestorState {
    /// Created, but the loop has not started yet.
    Connecting,
    /// Waiting on the event source for the next message.
    Polling,
    /// Handing a message to the writer.
    Processing,
    /// The loop has exited and the source has been closed.
    Closed,
}

impl Display for IngestorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IngestorState::Connecting => "Connecting",
            IngestorState::Polling => "Polling",
            IngestorState::Processing => "Processing",
            IngestorState::Closed => "Closed",
        };
        write!(f, "{s}")
    }
}

/// Counters collected over the lifetime of an ingestion loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub processed: u64,
    pub failed: u64,
    pub read_errors: u64,
}

impl Display for IngestSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} processed, {} failed, {} read errors", self.processed, self.failed, self.read_errors)
    }
}

/// Pulls order messages from an event source and persists them, one at a time and in stream order.
///
/// No message ever stops the loop. A payload that cannot be decoded, or that the store refuses, is logged, counted
/// and acknowledged so that the stream keeps moving. A failed read is logged and retried after `retry_delay`.
///
/// The loop ends when the cancellation token fires, or when the source reports that the stream has ended.
/// Cancellation is only observed between messages, so a message that is being processed is always seen through to
/// the end. On exit the source is closed.
pub struct EventIngestor<S, B, C> {
    source: S,
    writer: OrderWriter<B, C>,
    retry_delay: Duration,
    state: watch::Sender<IngestorState>,
}

impl<S, B, C> EventIngestor<S, B, C>
where
    S: OrderEventSource,
    B: OrderStore,
    C: OrderCache,
{
    pub fn new(source: S, writer: OrderWriter<B, C>) -> Self {
        let (state, _) = watch::channel(IngestorState::Connecting);
        Self { source, writer, retry_delay: DEFAULT_RETRY_DELAY, state }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Returns a receiver that tracks the state of the loop.
    pub fn subscribe_state(&self) -> watch::Receiver<IngestorState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> IngestorState {
        *self.state.borrow()
    }

    pub async fn run(mut self, shutdown: CancellationToken) -> IngestSummary {
        let mut summary = IngestSummary::default();
        info!("📨️ Order ingestor started");
        loop {
            self.set_state(IngestorState::Polling);
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("📨️ Shutdown requested. Order ingestor is stopping.");
                    break;
                },
                next = self.source.next_message() => next,
            };
            match next {
                Ok(Some(message)) => {
                    self.set_state(IngestorState::Processing);
                    self.handle_message(&message, &mut summary).await;
                },
                Ok(None) => {
                    info!("📨️ The event stream has ended");
                    break;
                },
                Err(EventSourceError::Closed) => {
                    warn!("📨️ The event source was closed underneath the ingestor");
                    break;
                },
                Err(e) => {
                    summary.read_errors += 1;
                    warn!("📨️ {e}. Retrying in {:?}", self.retry_delay);
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.retry_delay) => {},
                    }
                },
            }
        }
        if let Err(e) = self.source.close().await {
            warn!("📨️ Could not close the event source cleanly. {e}");
        }
        self.set_state(IngestorState::Closed);
        info!("📨️ Order ingestor has shut down. {summary}");
        summary
    }

    async fn handle_message(&mut self, message: &StreamMessage, summary: &mut IngestSummary) {
        trace!("📨️ Received {message}");
        match self.writer.ingest(&message.payload).await {
            Ok(order) => {
                summary.processed += 1;
                debug!("📨️ Order {} ingested from {message}", order.order_uid);
            },
            Err(IngestError::Validation(e)) => {
                summary.failed += 1;
                warn!("📨️ Skipping malformed message {message}. {e}");
            },
            Err(IngestError::Persistence(e)) => {
                summary.failed += 1;
                error!("📨️ Could not save the order in {message}. {e}");
            },
        }
        if let Err(e) = self.source.acknowledge(message).await {
            warn!("📨️ Could not acknowledge {message}. {e}");
        }
    }

    fn set_state(&self, state: IngestorState) {
        let old = self.state.send_replace(state);
        if old != state {
            trace!("📨️ Ingestor state: {old} -> {state}");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{events::event_channel, test_utils::StubStore, MemoryOrderCache};

    const PAYLOAD: &str = r#"{"order_uid":"o-1","track_number":"T-1","items":[{"chrt_id":1,"track_number":"T-1"}]}"#;

    fn ingestor(
        store: StubStore,
    ) -> (crate::events::EventPublisher, EventIngestor<crate::events::ChannelEventSource, StubStore, MemoryOrderCache>)
    {
        let (publisher, source) = event_channel("orders", 16);
        let writer = OrderWriter::new(store, MemoryOrderCache::default());
        let ingestor = EventIngestor::new(source, writer).with_retry_delay(Duration::from_millis(10));
        (publisher, ingestor)
    }

    #[tokio::test]
    async fn drains_the_stream_and_acknowledges_everything() {
        let _ = env_logger::try_init();
        let store = StubStore::default();
        let (publisher, ingestor) = ingestor(store.clone());
        publisher.publish(PAYLOAD).await;
        publisher.publish("not json").await;
        publisher.publish_error("flaky broker").await;
        publisher.publish(r#"{"order_uid":"o-2","track_number":"T-2"}"#).await;
        let cursor = publisher.cursor();
        drop(publisher);
        let summary = ingestor.run(CancellationToken::new()).await;
        assert_eq!(summary, IngestSummary { processed: 2, failed: 1, read_errors: 1 });
        assert_eq!(cursor.committed_offset(), Some(2));
        assert_eq!(store.upsert_count(), 2);
    }

    #[tokio::test]
    async fn store_failures_do_not_stop_the_loop() {
        let _ = env_logger::try_init();
        let store = StubStore::default();
        store.fail_upserts(true);
        let (publisher, ingestor) = ingestor(store.clone());
        publisher.publish(PAYLOAD).await;
        publisher.publish(PAYLOAD).await;
        let cursor = publisher.cursor();
        drop(publisher);
        let summary = ingestor.run(CancellationToken::new()).await;
        assert_eq!(summary, IngestSummary { processed: 0, failed: 2, read_errors: 0 });
        assert_eq!(cursor.committed_offset(), Some(1));
    }

    #[tokio::test]
    async fn cancellation_stops_an_idle_loop() {
        let _ = env_logger::try_init();
        let (publisher, ingestor) = ingestor(StubStore::default());
        let mut state = ingestor.subscribe_state();
        assert_eq!(*state.borrow(), IngestorState::Connecting);
        let token = CancellationToken::new();
        let handle = tokio::spawn(ingestor.run(token.clone()));
        state.wait_for(|s| *s == IngestorState::Polling).await.unwrap();
        token.cancel();
        let summary = handle.await.unwrap();
        assert_eq!(summary, IngestSummary::default());
        assert_eq!(*state.borrow(), IngestorState::Closed);
        // the source was closed on the way out
        assert_eq!(publisher.publish(PAYLOAD).await, None);
    }
}
