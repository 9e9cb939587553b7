use std::sync::{Arc, Weak};

use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::{ClientConfig, Message, Offset};
use thiserror::Error;
use tracing::info;

use crate::api::AckDecision;
use crate::config::Config;

/// Single-topic consumer with manual offset storage.
///
/// Offsets are stored only when a message settles on an acknowledgment path;
/// the background auto-commit then persists them. A message settling on the
/// leave-unacknowledged path is never stored. Instead the partition is
/// rewound to it, so the next poll re-presents the same message.
pub struct TopicConsumer {
    inner: Arc<Inner>,
}

struct Inner {
    consumer: StreamConsumer,
    topic: String,
}

/// Delivery coordinates of one received message. Consumed exactly once by
/// `TopicConsumer::settle`.
pub struct DeliveryTag {
    handle: Weak<Inner>,
    partition: i32,
    offset: i64,
}

#[derive(Debug, Error)]
pub enum AckError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),
    #[error("consumer gone")]
    Gone,
}

impl TopicConsumer {
    pub fn new(config: &Config) -> Result<Self, KafkaError> {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &config.kafka.kafka_hosts)
            .set("statistics.interval.ms", "10000")
            .set("group.id", &config.consumer_group)
            .set("auto.offset.reset", &config.kafka_consumer_offset_reset)
            // Offsets are stored per settled message, never by the consumer
            // itself; the periodic commit persists what was stored.
            .set("enable.auto.offset.store", "false")
            .set("enable.auto.commit", "true");

        if config.kafka.kafka_tls {
            client_config
                .set("security.protocol", "ssl")
                .set("enable.ssl.certificate.verification", "false");
        };

        let consumer: StreamConsumer = client_config.create()?;
        consumer.subscribe(&[config.event_topic.as_str()])?;
        info!(
            topic = %config.event_topic,
            group = %config.consumer_group,
            "subscribed to event topic"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                consumer,
                topic: config.event_topic.clone(),
            }),
        })
    }

    /// Wait for the next message, returning its raw body and delivery tag.
    /// No decoding happens here; the dispatcher owns interpretation.
    pub async fn recv(&self) -> Result<(Vec<u8>, DeliveryTag), KafkaError> {
        let message = self.inner.consumer.recv().await?;
        let tag = DeliveryTag {
            handle: Arc::downgrade(&self.inner),
            partition: message.partition(),
            offset: message.offset(),
        };
        Ok((message.payload().unwrap_or_default().to_vec(), tag))
    }

    /// The single call site translating an acknowledgment decision into a
    /// broker effect for one message.
    pub fn settle(&self, decision: &AckDecision, tag: DeliveryTag) -> Result<(), AckError> {
        match decision {
            AckDecision::AckAndDrop { .. } | AckDecision::AckAfterSuccess { .. } => tag.store(),
            AckDecision::LeaveUnacknowledged { .. } => tag.rewind(),
        }
    }
}

impl DeliveryTag {
    /// Positive acknowledgment: mark the offset for the next commit.
    fn store(self) -> Result<(), AckError> {
        let inner = self.handle.upgrade().ok_or(AckError::Gone)?;
        inner
            .consumer
            .store_offset(&inner.topic, self.partition, self.offset)?;
        Ok(())
    }

    /// No acknowledgment: rewind the partition so the broker re-presents
    /// this message on the next poll.
    fn rewind(self) -> Result<(), AckError> {
        let inner = self.handle.upgrade().ok_or(AckError::Gone)?;
        inner.consumer.seek(
            &inner.topic,
            self.partition,
            Offset::Offset(self.offset),
            std::time::Duration::from_secs(5),
        )?;
        Ok(())
    }
}
