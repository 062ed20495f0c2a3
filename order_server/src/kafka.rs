//! Kafka-backed order event source.
//!
//! The consumer joins a consumer group and subscribes to a single topic. Offsets are committed automatically in the
//! background, but an offset is only *stored* for commit once [`acknowledge`](OrderEventSource::acknowledge) has been
//! called for its message. A message that was read but not yet handled when the process stopped is therefore
//! redelivered to the group.
use log::*;
use order_engine::{EventSourceError, OrderEventSource, StreamMessage};
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
    message::Message,
};

use crate::config::KafkaConfig;

pub struct KafkaEventSource {
    consumer: Option<StreamConsumer>,
    topic: String,
}

impl KafkaEventSource {
    pub fn new(config: &KafkaConfig) -> Result<Self, EventSourceError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "true")
            .set("enable.auto.offset.store", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()
            .map_err(|e| EventSourceError::ReadError(format!("Could not create Kafka consumer. {e}")))?;
        consumer
            .subscribe(&[config.topic.as_str()])
            .map_err(|e| EventSourceError::ReadError(format!("Could not subscribe to {}. {e}", config.topic)))?;
        info!(
            "📨️ Subscribed to Kafka topic {} on {} as member of {}",
            config.topic, config.brokers, config.group_id
        );
        Ok(Self { consumer: Some(consumer), topic: config.topic.clone() })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    fn consumer(&self) -> Result<&StreamConsumer, EventSourceError> {
        self.consumer.as_ref().ok_or(EventSourceError::Closed)
    }
}

impl OrderEventSource for KafkaEventSource {
    async fn next_message(&mut self) -> Result<Option<StreamMessage>, EventSourceError> {
        let consumer = self.consumer()?;
        let message = consumer.recv().await.map_err(|e| EventSourceError::ReadError(e.to_string()))?;
        Ok(Some(StreamMessage {
            key: message.key().map(<[u8]>::to_vec),
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
        }))
    }

    async fn acknowledge(&mut self, message: &StreamMessage) -> Result<(), EventSourceError> {
        // librdkafka stores `offset + 1`, i.e. the position of the next message to consume
        self.consumer()?
            .store_offset(&message.topic, message.partition, message.offset)
            .map_err(|e| EventSourceError::AcknowledgeError(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), EventSourceError> {
        if let Some(consumer) = self.consumer.take() {
            if let Err(e) = consumer.commit_consumer_state(CommitMode::Sync) {
                debug!("📨️ No final offset commit for {}. {e}", self.topic);
            }
            consumer.unsubscribe();
            info!("📨️ Kafka consumer for {} closed", self.topic);
        }
        Ok(())
    }
}
