//! Shared fixtures for unit tests.

use crate::config::{Config, EventEncoding, KafkaConfig, NonEmptyString};
use crate::event::RepoEvent;

pub(crate) fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_owned(),
        port: 3305,
        print_sink: false,
        event_topic: "repo.events".to_owned(),
        consumer_group: "router-test".to_owned(),
        kafka_consumer_offset_reset: "earliest".to_owned(),
        autotag_topic: NonEmptyString("repo.autotag".to_owned()),
        extraction_topic: NonEmptyString("repo.extraction".to_owned()),
        event_encoding: EventEncoding::Auto,
        export_prometheus: false,
        kafka: KafkaConfig {
            kafka_producer_linger_ms: 0,
            kafka_producer_queue_mib: 50,
            kafka_message_timeout_ms: 500,
            kafka_compression_codec: "none".to_owned(),
            kafka_tls: false,
            kafka_hosts: "localhost:9092".to_owned(),
        },
    }
}

pub(crate) fn binary_changed_event(path: &str) -> RepoEvent {
    RepoEvent {
        schema_version: 1,
        event_type: "BINARY_CHANGED".to_owned(),
        timestamp: 1000,
        node_ref: "workspace://SpacesStore/8f2e41aa".to_owned(),
        store_ref: "workspace://SpacesStore".to_owned(),
        parent_node_ref: None,
        name: None,
        path: Some(path.to_owned()),
        mime_type: None,
        size: None,
        encoding: None,
        version_label: None,
        creator: None,
        modifier: None,
        created_at: None,
        modified_at: None,
        node_type: None,
    }
}
