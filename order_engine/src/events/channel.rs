use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use log::*;
use tokio::sync::mpsc;

use crate::traits::{EventSourceError, OrderEventSource, StreamMessage};

const NO_OFFSET: i64 = -1;

type Delivery = Result<StreamMessage, EventSourceError>;

/// Creates an in-process event stream for `topic`. Messages published through the [`EventPublisher`] (or any of its
/// clones) are delivered in order to the [`ChannelEventSource`]. When the last publisher is dropped, the source
/// reports the end of the stream once the buffer has drained.
pub fn event_channel(topic: &str, buffer_size: usize) -> (EventPublisher, ChannelEventSource) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    let committed = Arc::new(AtomicI64::new(NO_OFFSET));
    let publisher = EventPublisher {
        sender,
        topic: topic.to_string(),
        next_offset: Arc::new(AtomicI64::new(0)),
        committed: Arc::clone(&committed),
    };
    let source = ChannelEventSource { receiver, committed, closed: false };
    (publisher, source)
}

#[derive(Clone)]
pub struct EventPublisher {
    sender: mpsc::Sender<Delivery>,
    topic: String,
    next_offset: Arc<AtomicI64>,
    committed: Arc<AtomicI64>,
}

impl EventPublisher {
    /// Publishes a payload and returns the offset it was assigned. Returns `None` if the source has gone away.
    pub async fn publish<P: Into<Vec<u8>>>(&self, payload: P) -> Option<i64> {
        self.send(StreamMessage::new(payload)).await
    }

    pub async fn publish_keyed<K: Into<Vec<u8>>, P: Into<Vec<u8>>>(&self, key: K, payload: P) -> Option<i64> {
        self.send(StreamMessage::new(payload).with_key(key)).await
    }

    /// Makes the source fail its next read with [`EventSourceError::ReadError`].
    pub async fn publish_error(&self, reason: &str) -> bool {
        self.sender.send(Err(EventSourceError::ReadError(reason.to_string()))).await.is_ok()
    }

    /// A read-only view of the stream cursor. It stays usable after the publisher is dropped.
    pub fn cursor(&self) -> StreamCursor {
        StreamCursor(Arc::clone(&self.committed))
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    async fn send(&self, mut message: StreamMessage) -> Option<i64> {
        let offset = self.next_offset.fetch_add(1, Ordering::SeqCst);
        message.topic = self.topic.clone();
        message.offset = offset;
        match self.sender.send(Ok(message)).await {
            Ok(()) => Some(offset),
            Err(e) => {
                error!("📨️ Failed to publish message: {e}");
                None
            },
        }
    }
}

#[derive(Clone)]
pub struct StreamCursor(Arc<AtomicI64>);

impl StreamCursor {
    /// The offset of the most recently acknowledged message, if any message has been acknowledged yet.
    pub fn committed_offset(&self) -> Option<i64> {
        match self.0.load(Ordering::SeqCst) {
            NO_OFFSET => None,
            offset => Some(offset),
        }
    }
}

/// The receiving end of [`event_channel`].
pub struct ChannelEventSource {
    receiver: mpsc::Receiver<Delivery>,
    committed: Arc<AtomicI64>,
    closed: bool,
}

impl OrderEventSource for ChannelEventSource {
    async fn next_message(&mut self) -> Result<Option<StreamMessage>, EventSourceError> {
        if self.closed {
            return Err(EventSourceError::Closed);
        }
        match self.receiver.recv().await {
            Some(delivery) => delivery.map(Some),
            None => Ok(None),
        }
    }

    async fn acknowledge(&mut self, message: &StreamMessage) -> Result<(), EventSourceError> {
        if self.closed {
            return Err(EventSourceError::Closed);
        }
        self.committed.fetch_max(message.offset, Ordering::SeqCst);
        trace!("📨️ Acknowledged {message}");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), EventSourceError> {
        self.receiver.close();
        self.closed = true;
        Ok(())
    }
}
