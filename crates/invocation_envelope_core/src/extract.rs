use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};

use crate::contract::{HeaderMap, InvocationContext, InvocationEvent, Payload};

/// Reasons an event cannot be turned into a payload.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("event does not match the HTTP invocation shape: {0}")]
    EventShape(#[source] serde_json::Error),

    #[error("body is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("decoded body is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("body must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

pub fn parse_event(raw: Value) -> Result<InvocationEvent, ExtractError> {
    serde_json::from_value(raw).map_err(ExtractError::EventShape)
}

/// Base payload before enrichment: the parsed body when one is present
/// (even if empty), otherwise the query parameters.
pub fn extract_payload(event: &InvocationEvent) -> Result<Payload, ExtractError> {
    match event.body.as_deref() {
        Some(body) => parse_body(body, event.is_base64_encoded),
        None => Ok(event
            .query_string_parameters
            .as_ref()
            .map(string_map_to_payload)
            .unwrap_or_default()),
    }
}

fn parse_body(body: &str, is_base64_encoded: bool) -> Result<Payload, ExtractError> {
    let value: Value = if is_base64_encoded {
        let bytes = STANDARD.decode(body)?;
        let text = String::from_utf8(bytes)?;
        serde_json::from_str(&text)?
    } else {
        serde_json::from_str(body)?
    };

    match value {
        Value::Object(object) => Ok(object),
        other => Err(ExtractError::NotAnObject(json_kind(&other))),
    }
}

/// Enriched payload handed to the user handler. Path parameters are merged
/// after the base payload and win on key collisions; `context`, `headers`
/// and `authorizer` are injected last.
pub fn enrich_payload(
    base: &Payload,
    event: &InvocationEvent,
    context: &InvocationContext,
) -> Payload {
    let mut enriched = base.clone();

    if let Some(path_parameters) = &event.path_parameters {
        for (key, value) in path_parameters {
            enriched.insert(key.clone(), Value::from(value.clone()));
        }
    }

    enriched.insert("context".to_string(), context.to_payload_value());
    enriched.insert(
        "headers".to_string(),
        Value::Object(normalize_headers(event.headers.as_ref())),
    );
    match event.authorizer() {
        Some(authorizer) => {
            enriched.insert("authorizer".to_string(), authorizer.clone());
        }
        None => {
            enriched.remove("authorizer");
        }
    }

    enriched
}

/// Lowercases header names. When two names collide after lowercasing, the
/// one sorting last in the source map wins.
pub fn normalize_headers(headers: Option<&HeaderMap>) -> Map<String, Value> {
    headers
        .into_iter()
        .flatten()
        .map(|(name, value)| (name.to_ascii_lowercase(), Value::from(value.clone())))
        .collect()
}

fn string_map_to_payload(values: &BTreeMap<String, String>) -> Payload {
    values
        .iter()
        .map(|(key, value)| (key.clone(), Value::from(value.clone())))
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::contract::EventRequestContext;

    use super::*;

    fn get_event() -> InvocationEvent {
        InvocationEvent {
            query_string_parameters: Some(BTreeMap::from([
                ("page".to_string(), "2".to_string()),
                ("id".to_string(), "from-query".to_string()),
            ])),
            headers: Some(BTreeMap::from([
                ("Content-Type".to_string(), "application/json".to_string()),
                ("X-Trace-Id".to_string(), "abc".to_string()),
            ])),
            ..InvocationEvent::default()
        }
    }

    #[test]
    fn query_parameters_become_payload_without_body() {
        let payload = extract_payload(&get_event()).expect("extraction should pass");
        assert_eq!(
            Value::Object(payload),
            json!({"page": "2", "id": "from-query"})
        );
    }

    #[test]
    fn missing_body_and_query_yield_empty_payload() {
        let payload =
            extract_payload(&InvocationEvent::default()).expect("extraction should pass");
        assert!(payload.is_empty());
    }

    #[test]
    fn body_takes_precedence_over_query() {
        let event = InvocationEvent {
            body: Some("{\"name\":\"widget\",\"qty\":3}".to_string()),
            ..get_event()
        };
        let payload = extract_payload(&event).expect("extraction should pass");
        assert_eq!(Value::Object(payload), json!({"name": "widget", "qty": 3}));
    }

    #[test]
    fn empty_present_body_is_parsed_not_skipped() {
        let event = InvocationEvent {
            body: Some(String::new()),
            ..get_event()
        };
        let error = extract_payload(&event).expect_err("empty body is malformed JSON");
        assert!(matches!(error, ExtractError::Json(_)));
    }

    #[test]
    fn base64_body_is_decoded_before_parsing() {
        let event = InvocationEvent {
            body: Some(STANDARD.encode("{\"ok\":true}")),
            is_base64_encoded: true,
            ..InvocationEvent::default()
        };
        let payload = extract_payload(&event).expect("extraction should pass");
        assert_eq!(Value::Object(payload), json!({"ok": true}));
    }

    #[test]
    fn invalid_base64_body_is_malformed() {
        let event = InvocationEvent {
            body: Some("not base64 !!".to_string()),
            is_base64_encoded: true,
            ..InvocationEvent::default()
        };
        let error = extract_payload(&event).expect_err("base64 should fail");
        assert!(matches!(error, ExtractError::Base64(_)));
    }

    #[test]
    fn non_object_body_is_malformed() {
        let event = InvocationEvent {
            body: Some("[1,2,3]".to_string()),
            ..InvocationEvent::default()
        };
        let error = extract_payload(&event).expect_err("arrays are not payloads");
        assert_eq!(error.to_string(), "body must be a JSON object, got array");
    }

    #[test]
    fn raw_event_with_wrong_shape_is_rejected() {
        let error = parse_event(json!({"headers": {"X-Count": 3}}))
            .expect_err("numeric header values are not accepted");
        assert!(matches!(error, ExtractError::EventShape(_)));
    }

    #[test]
    fn null_base64_flag_reads_as_plain_body() {
        let event = parse_event(json!({"body": "{\"a\":1}", "isBase64Encoded": null}))
            .expect("null flag should be accepted");
        assert!(!event.is_base64_encoded);

        let payload = extract_payload(&event).expect("extraction should pass");
        assert_eq!(Value::Object(payload), json!({"a": 1}));
    }

    #[test]
    fn enrichment_merges_path_parameters_last_and_lowercases_headers() {
        let event = InvocationEvent {
            path_parameters: Some(BTreeMap::from([(
                "id".to_string(),
                "from-path".to_string(),
            )])),
            ..get_event()
        };
        let context = InvocationContext::new("stream", "req");
        let base = extract_payload(&event).expect("extraction should pass");

        let enriched = enrich_payload(&base, &event, &context);

        assert_eq!(enriched["id"], json!("from-path"));
        assert_eq!(enriched["page"], json!("2"));
        assert_eq!(
            enriched["headers"],
            json!({"content-type": "application/json", "x-trace-id": "abc"})
        );
        assert_eq!(enriched["context"]["requestId"], json!("stream\\req"));
        assert!(!enriched.contains_key("authorizer"));
        assert_eq!(base["id"], json!("from-query"));
    }

    #[test]
    fn enrichment_injects_authorizer_claims() {
        let event = InvocationEvent {
            request_context: Some(EventRequestContext {
                authorizer: Some(json!({"claims": {"sub": "user-1"}})),
            }),
            ..InvocationEvent::default()
        };
        let enriched = enrich_payload(&Payload::new(), &event, &InvocationContext::default());
        assert_eq!(enriched["authorizer"]["claims"]["sub"], json!("user-1"));
        assert_eq!(enriched["headers"], json!({}));
    }
}
