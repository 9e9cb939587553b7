use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::api::RouterError;

pub mod kafka;

pub use kafka::KafkaSink;

/// Hands a serialized payload to the broker for a named destination queue.
#[async_trait]
pub trait QueueSink {
    async fn publish(&self, queue: &str, payload: &Map<String, Value>) -> Result<(), RouterError>;
}

/// Sink that logs payloads instead of producing, for local runs.
pub struct PrintSink {}

#[async_trait]
impl QueueSink for PrintSink {
    async fn publish(&self, queue: &str, payload: &Map<String, Value>) -> Result<(), RouterError> {
        tracing::info!("publish to {}: {:?}", queue, payload);
        Ok(())
    }
}
