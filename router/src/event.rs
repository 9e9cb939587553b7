use serde::Serialize;
use serde_json::{Map, Value};

use crate::api::RouterError;

/// A validated repository change notification.
///
/// Built once per inbound message from the decoded field mapping, immutable
/// afterwards, and discarded when the message settles. Serialization uses
/// the producer's camelCase wire names, so a published payload re-reads as
/// the JSON wire encoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoEvent {
    pub schema_version: i64,
    pub event_type: String,
    pub timestamp: i64,

    pub node_ref: String,
    pub store_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_node_ref: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_label: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<TimestampValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<TimestampValue>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
}

/// Audit timestamp, accepted as epoch millis or an ISO-8601 string and kept
/// verbatim. Downstream consumers normalize.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TimestampValue {
    Epoch(i64),
    Text(String),
}

impl RepoEvent {
    /// Validate a decoded field mapping into the canonical event.
    ///
    /// Fails on the first missing or malformed required field, naming it.
    /// Unknown fields are ignored so producers can evolve their schema, and
    /// the event type is an opaque string: filtering on it is a routing
    /// concern, not a validation concern.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<RepoEvent, RouterError> {
        Ok(RepoEvent {
            schema_version: required_int(fields, "schemaVersion")?,
            event_type: required_string(fields, "eventType")?,
            timestamp: required_int(fields, "timestamp")?,
            node_ref: required_string(fields, "nodeRef")?,
            store_ref: required_string(fields, "storeRef")?,
            parent_node_ref: optional_string(fields, "parentNodeRef")?,
            name: optional_string(fields, "name")?,
            path: optional_string(fields, "path")?,
            mime_type: optional_string(fields, "mimeType")?,
            size: optional_int(fields, "size")?,
            encoding: optional_string(fields, "encoding")?,
            version_label: optional_string(fields, "versionLabel")?,
            creator: optional_string(fields, "creator")?,
            modifier: optional_string(fields, "modifier")?,
            created_at: optional_timestamp(fields, "createdAt")?,
            modified_at: optional_timestamp(fields, "modifiedAt")?,
            node_type: optional_string(fields, "nodeType")?,
        })
    }

    /// The full field set of the event, as published by the default route
    /// transform.
    pub fn to_fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(fields)) => fields,
            // A struct with named fields always serializes to an object
            _ => Map::new(),
        }
    }
}

// The key=value wire encoding delivers every value as a string, so integer
// fields also accept numeric strings.
fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn required_string(fields: &Map<String, Value>, field: &'static str) -> Result<String, RouterError> {
    match fields.get(field) {
        None | Some(Value::Null) => Err(RouterError::MissingField(field)),
        Some(Value::String(text)) if text.is_empty() => Err(RouterError::MalformedField {
            field,
            reason: "must not be empty".to_owned(),
        }),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(_) => Err(RouterError::MalformedField {
            field,
            reason: "expected a string".to_owned(),
        }),
    }
}

fn required_int(fields: &Map<String, Value>, field: &'static str) -> Result<i64, RouterError> {
    match fields.get(field) {
        None | Some(Value::Null) => Err(RouterError::MissingField(field)),
        Some(value) => coerce_int(value).ok_or(RouterError::MalformedField {
            field,
            reason: "expected an integer".to_owned(),
        }),
    }
}

fn optional_string(
    fields: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, RouterError> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(RouterError::MalformedField {
            field,
            reason: "expected a string".to_owned(),
        }),
    }
}

fn optional_int(
    fields: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<i64>, RouterError> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => coerce_int(value).map(Some).ok_or(RouterError::MalformedField {
            field,
            reason: "expected an integer".to_owned(),
        }),
    }
}

fn optional_timestamp(
    fields: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<TimestampValue>, RouterError> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(TimestampValue::Text(text.clone()))),
        Some(Value::Number(number)) => match number.as_i64() {
            Some(epoch) => Ok(Some(TimestampValue::Epoch(epoch))),
            None => Err(RouterError::MalformedField {
                field,
                reason: "expected an integer or a string".to_owned(),
            }),
        },
        Some(_) => Err(RouterError::MalformedField {
            field,
            reason: "expected an integer or a string".to_owned(),
        }),
    }
}
