use std::time::Duration;

use async_trait::async_trait;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use rdkafka::ClientConfig;
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::api::RouterError;
use crate::config::KafkaConfig;
use crate::sinks::QueueSink;

#[derive(Clone)]
pub struct KafkaSink {
    producer: FutureProducer,
}

impl KafkaSink {
    pub fn new(config: &KafkaConfig) -> anyhow::Result<KafkaSink> {
        info!("connecting to Kafka brokers at {}...", config.kafka_hosts);

        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &config.kafka_hosts)
            .set("statistics.interval.ms", "10000")
            .set("linger.ms", config.kafka_producer_linger_ms.to_string())
            .set(
                "message.timeout.ms",
                config.kafka_message_timeout_ms.to_string(),
            )
            .set(
                "compression.codec",
                config.kafka_compression_codec.to_owned(),
            )
            .set(
                "queue.buffering.max.kbytes",
                (config.kafka_producer_queue_mib * 1024).to_string(),
            )
            // Deliveries count only once the full in-sync replica set has them
            .set("request.required.acks", "-1");

        if config.kafka_tls {
            client_config
                .set("security.protocol", "ssl")
                .set("enable.ssl.certificate.verification", "false");
        };

        debug!("rdkafka configuration: {:?}", client_config);
        let producer: FutureProducer = client_config.create()?;

        // Ping the cluster to make sure we can reach brokers, fail after 10 seconds
        drop(
            producer
                .client()
                .fetch_metadata(None, Timeout::After(Duration::new(10, 0)))?,
        );
        info!("connected to Kafka brokers");

        Ok(KafkaSink { producer })
    }
}

#[async_trait]
impl QueueSink for KafkaSink {
    async fn publish(&self, queue: &str, payload: &Map<String, Value>) -> Result<(), RouterError> {
        let body = serde_json::to_string(payload).map_err(|e| {
            error!("failed to serialize payload: {}", e);
            RouterError::RetryableSinkError
        })?;

        // Keep events for one node on one partition
        let key = payload.get("nodeRef").and_then(Value::as_str);

        let headers = OwnedHeaders::new().insert(Header {
            key: "content-type",
            value: Some("application/json"),
        });

        let delivery = self
            .producer
            .send(
                FutureRecord {
                    topic: queue,
                    payload: Some(&body),
                    partition: None,
                    key,
                    timestamp: None,
                    headers: Some(headers),
                },
                Timeout::Never,
            )
            .await;

        match delivery {
            Ok(_) => {
                metrics::counter!("router_messages_published_total", "queue" => queue.to_owned())
                    .increment(1);
                Ok(())
            }
            Err((err, _)) => {
                metrics::counter!("router_publish_errors_total", "queue" => queue.to_owned())
                    .increment(1);
                error!("failed to publish to {}: {}", queue, err);
                Err(RouterError::RetryableSinkError)
            }
        }
    }
}
