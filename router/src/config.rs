use std::str::FromStr;

use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "3305")]
    pub port: u16,

    #[envconfig(default = "false")]
    pub print_sink: bool,

    pub event_topic: String,

    pub consumer_group: String,

    #[envconfig(default = "earliest")]
    pub kafka_consumer_offset_reset: String,

    pub autotag_topic: NonEmptyString,

    pub extraction_topic: NonEmptyString,

    #[envconfig(default = "auto")]
    pub event_encoding: EventEncoding,

    #[envconfig(default = "true")]
    pub export_prometheus: bool,

    #[envconfig(nested = true)]
    pub kafka: KafkaConfig,
}

impl Config {
    /// Produce a host:port address for binding a TcpListener.
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Envconfig, Clone)]
pub struct KafkaConfig {
    #[envconfig(default = "20")]
    pub kafka_producer_linger_ms: u32, // Maximum time between producer batches during low traffic

    #[envconfig(default = "400")]
    pub kafka_producer_queue_mib: u32, // Size of the in-memory producer queue in mebibytes

    #[envconfig(default = "20000")]
    pub kafka_message_timeout_ms: u32, // Time before we stop retrying producing a message: 20 seconds

    #[envconfig(default = "none")]
    pub kafka_compression_codec: String, // none, gzip, snappy, lz4, zstd

    #[envconfig(default = "false")]
    pub kafka_tls: bool,

    pub kafka_hosts: String,
}

/// Wire encoding of the inbound message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventEncoding {
    /// Try the JSON form first, fall back to the braced key=value form.
    Auto,
    Json,
    KeyValue,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEventEncodingError;

impl FromStr for EventEncoding {
    type Err = ParseEventEncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(EventEncoding::Auto),
            "json" => Ok(EventEncoding::Json),
            "key-value" | "keyvalue" => Ok(EventEncoding::KeyValue),
            _ => Err(ParseEventEncodingError),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NonEmptyString(pub String);

impl NonEmptyString {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct StringIsEmptyError;

impl FromStr for NonEmptyString {
    type Err = StringIsEmptyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            Err(StringIsEmptyError)
        } else {
            Ok(NonEmptyString(s.to_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EventEncoding, NonEmptyString, ParseEventEncodingError, StringIsEmptyError};

    #[test]
    fn parse_event_encoding() {
        assert_eq!("auto".parse(), Ok(EventEncoding::Auto));
        assert_eq!("json".parse(), Ok(EventEncoding::Json));
        assert_eq!("key-value".parse(), Ok(EventEncoding::KeyValue));
        assert_eq!("KeyValue".parse(), Ok(EventEncoding::KeyValue));
        assert_eq!(
            "protobuf".parse::<EventEncoding>(),
            Err(ParseEventEncodingError)
        );
    }

    #[test]
    fn parse_non_empty_string() {
        assert_eq!(
            "repo.autotag".parse::<NonEmptyString>().unwrap().as_str(),
            "repo.autotag"
        );
        assert_eq!("".parse::<NonEmptyString>().unwrap_err(), StringIsEmptyError);
    }
}
