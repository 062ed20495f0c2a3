use std::fmt::Display;

use thiserror::Error;

/// A single message pulled from the order event stream.
///
/// `topic`, `partition` and `offset` identify the stream cursor position of the message. The key is informational
/// only; the engine logs it but never parses it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamMessage {
    pub key: Option<Vec<u8>>,
    pub payload: Vec<u8>,
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl StreamMessage {
    pub fn new<P: Into<Vec<u8>>>(payload: P) -> Self {
        Self { payload: payload.into(), ..Default::default() }
    }

    pub fn with_key<K: Into<Vec<u8>>>(mut self, key: K) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn key_str(&self) -> String {
        self.key.as_ref().map(|k| String::from_utf8_lossy(k).into_owned()).unwrap_or_else(|| "<none>".into())
    }
}

impl Display for StreamMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]@{} key={}", self.topic, self.partition, self.offset, self.key_str())
    }
}

/// An at-least-once source of order payloads, e.g. a consumer group member on a message broker topic.
#[allow(async_fn_in_trait)]
pub trait OrderEventSource {
    /// Waits for the next message. `Ok(None)` means the stream has ended and no further messages will arrive.
    ///
    /// Implementations must be cancel-safe: dropping the returned future must not lose a message.
    async fn next_message(&mut self) -> Result<Option<StreamMessage>, EventSourceError>;

    /// Advances the stream cursor past `message`.
    async fn acknowledge(&mut self, message: &StreamMessage) -> Result<(), EventSourceError>;

    /// Terminates the stream connection.
    async fn close(&mut self) -> Result<(), EventSourceError>;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EventSourceError {
    #[error("Could not read from the event stream: {0}")]
    ReadError(String),
    #[error("Could not advance the stream cursor: {0}")]
    AcknowledgeError(String),
    #[error("The event stream has been closed")]
    Closed,
}
