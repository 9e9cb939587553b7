use serde_json::{Map, Value};

use crate::api::RouterError;
use crate::config::EventEncoding;

/// Decode a raw message body into a flat field mapping.
///
/// Two wire encodings are accepted: a JSON object, and the braced
/// comma-separated `{key=value, ...}` form older repository extensions emit.
/// Decoding only checks well-formedness of the encoding; field content is
/// the model's concern.
pub fn decode(encoding: EventEncoding, raw: &[u8]) -> Result<Map<String, Value>, RouterError> {
    match encoding {
        EventEncoding::Json => decode_json(raw),
        EventEncoding::KeyValue => decode_key_value(raw),
        EventEncoding::Auto => match decode_json(raw) {
            Ok(fields) => Ok(fields),
            // A body that fails to parse may be the key=value form. A
            // well-formed JSON document of the wrong shape is not.
            Err(RouterError::ParseError(_)) => decode_key_value(raw),
            Err(err) => Err(err),
        },
    }
}

fn decode_json(raw: &[u8]) -> Result<Map<String, Value>, RouterError> {
    match serde_json::from_slice(raw)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(RouterError::DecodeError(
            "message body is not a JSON object".to_owned(),
        )),
    }
}

/// `{k1=v1, k2=v2}`: one outer brace pair, comma-separated segments, each
/// split at its first `=`. All values are plain strings; the encoding has no
/// quoting, so values cannot themselves contain `,` or `=`.
fn decode_key_value(raw: &[u8]) -> Result<Map<String, Value>, RouterError> {
    let body = std::str::from_utf8(raw)
        .map_err(|_| RouterError::DecodeError("message body is not valid UTF-8".to_owned()))?
        .trim();

    let inner = body
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or_else(|| {
            RouterError::DecodeError("missing outer braces around key=value body".to_owned())
        })?
        .trim();

    let mut fields = Map::new();
    if inner.is_empty() {
        return Ok(fields);
    }

    for segment in inner.split(',') {
        let (key, value) = segment.split_once('=').ok_or_else(|| {
            RouterError::DecodeError("segment without '=' separator".to_owned())
        })?;
        fields.insert(
            key.trim().to_owned(),
            Value::String(value.trim().to_owned()),
        );
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::decode;
    use crate::api::RouterError;
    use crate::config::EventEncoding;

    #[test]
    fn decodes_json_object() {
        let raw = br#"{"eventType":"BINARY_CHANGED","nodeRef":"n1","size":42}"#;
        let fields = decode(EventEncoding::Json, raw).unwrap();
        assert_eq!(fields.get("eventType"), Some(&json!("BINARY_CHANGED")));
        assert_eq!(fields.get("size"), Some(&json!(42)));
    }

    #[test]
    fn rejects_json_non_object() {
        let err = decode(EventEncoding::Json, b"[1, 2]").unwrap_err();
        assert!(matches!(err, RouterError::DecodeError(_)));
    }

    #[test]
    fn decodes_key_value_pairs() {
        let raw = b"{nodeRef=n1, eventType=DELETE, path=/Company Home/a.txt}";
        let fields = decode(EventEncoding::KeyValue, raw).unwrap();
        assert_eq!(fields.get("nodeRef"), Some(&json!("n1")));
        assert_eq!(fields.get("eventType"), Some(&json!("DELETE")));
        assert_eq!(fields.get("path"), Some(&json!("/Company Home/a.txt")));
    }

    #[test]
    fn key_value_splits_on_first_equals_only() {
        let fields = decode(EventEncoding::KeyValue, b"{name=a=b}").unwrap();
        assert_eq!(fields.get("name"), Some(&json!("a=b")));
    }

    #[test]
    fn key_value_empty_braces_yield_empty_mapping() {
        let fields = decode(EventEncoding::KeyValue, b"{}").unwrap();
        assert!(fields.is_empty());
        let fields = decode(EventEncoding::KeyValue, b"{  }").unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn key_value_requires_outer_braces() {
        let err = decode(EventEncoding::KeyValue, b"nodeRef=n1").unwrap_err();
        assert!(matches!(err, RouterError::DecodeError(_)));
        let err = decode(EventEncoding::KeyValue, b"{nodeRef=n1").unwrap_err();
        assert!(matches!(err, RouterError::DecodeError(_)));
    }

    #[test]
    fn key_value_requires_separator_in_every_segment() {
        let err = decode(EventEncoding::KeyValue, b"{nodeRef=n1, orphan}").unwrap_err();
        assert!(matches!(err, RouterError::DecodeError(_)));
    }

    #[test]
    fn auto_prefers_json() {
        let fields = decode(EventEncoding::Auto, br#"{"size": 42}"#).unwrap();
        assert_eq!(fields.get("size"), Some(&json!(42)));
    }

    #[test]
    fn auto_falls_back_to_key_value() {
        let fields = decode(EventEncoding::Auto, b"{nodeRef=n1, storeRef=s1}").unwrap();
        assert_eq!(fields.get("nodeRef"), Some(&json!("n1")));
        assert_eq!(fields.get("storeRef"), Some(&json!("s1")));
    }

    #[test]
    fn auto_does_not_fall_back_for_json_of_wrong_shape() {
        let err = decode(EventEncoding::Auto, b"\"just a string\"").unwrap_err();
        assert!(matches!(err, RouterError::DecodeError(_)));
    }

    #[test]
    fn rejects_invalid_utf8() {
        let err = decode(EventEncoding::Auto, &[0x7b, 0xff, 0xfe, 0x7d]).unwrap_err();
        assert!(matches!(err, RouterError::DecodeError(_)));
    }
}
