use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const CORS_ALLOW_ORIGIN_HEADER: &str = "Access-Control-Allow-Origin";
pub const CORS_ALLOW_ORIGIN_ANY: &str = "*";
pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";
pub const DEFAULT_SUCCESS_STATUS_CODE: u16 = 200;
pub const DEFAULT_ERROR_STATUS_CODE: u16 = 500;
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error. No error message";
pub const UNKNOWN_ERROR_NAME: &str = "UnknownError";

/// Key whose presence marks a JSON handler result as structured.
pub const STRUCTURED_RESULT_MARKER: &str = "response";

/// Keys of the emitted response that option passthrough never overwrites.
pub const RESERVED_RESPONSE_KEYS: [&str; 3] = ["statusCode", "headers", "body"];

/// Data handed through the pipeline: always a JSON object.
pub type Payload = Map<String, Value>;

pub type HeaderMap = BTreeMap<String, String>;

/// HTTP-style invocation event as delivered by the host platform.
///
/// Missing and `null` mappings deserialize to `None`; unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvocationEvent {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_base64_encoded: bool,
    #[serde(default)]
    pub query_string_parameters: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub path_parameters: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub headers: Option<HeaderMap>,
    #[serde(default)]
    pub request_context: Option<EventRequestContext>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventRequestContext {
    #[serde(default)]
    pub authorizer: Option<Value>,
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

impl InvocationEvent {
    pub fn authorizer(&self) -> Option<&Value> {
        self.request_context
            .as_ref()
            .and_then(|context| context.authorizer.as_ref())
    }
}

/// Correlation and timing metadata supplied by the platform for one invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InvocationContext {
    pub log_stream_name: String,
    pub aws_request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoked_function_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit_in_mb: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xray_trace_id: Option<String>,
}

impl InvocationContext {
    pub fn new(log_stream_name: impl Into<String>, aws_request_id: impl Into<String>) -> Self {
        Self {
            log_stream_name: log_stream_name.into(),
            aws_request_id: aws_request_id.into(),
            ..Self::default()
        }
    }

    /// Composite correlation id: `{logStreamName}\{awsRequestId}`.
    pub fn request_id(&self) -> String {
        format!("{}\\{}", self.log_stream_name, self.aws_request_id)
    }

    /// Object injected into the enriched payload under `context`.
    pub fn to_payload_value(&self) -> Value {
        let mut object = Map::new();
        object.insert(
            "logStreamName".to_string(),
            Value::from(self.log_stream_name.clone()),
        );
        object.insert(
            "awsRequestId".to_string(),
            Value::from(self.aws_request_id.clone()),
        );
        object.insert("requestId".to_string(), Value::from(self.request_id()));

        let optional = [
            ("functionName", self.function_name.clone().map(Value::from)),
            (
                "functionVersion",
                self.function_version.clone().map(Value::from),
            ),
            (
                "invokedFunctionArn",
                self.invoked_function_arn.clone().map(Value::from),
            ),
            ("memoryLimitInMb", self.memory_limit_in_mb.map(Value::from)),
            ("deadlineMs", self.deadline_ms.map(Value::from)),
            ("xrayTraceId", self.xray_trace_id.clone().map(Value::from)),
        ];
        for (key, value) in optional
            .into_iter()
            .filter_map(|(key, value)| value.map(|value| (key, value)))
        {
            object.insert(key.to_string(), value);
        }

        Value::Object(object)
    }
}

/// Response handed back to the platform. `extra` carries top-level fields
/// supplied through custom-response options (for example `isBase64Encoded`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseEnvelope {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: HeaderMap,
    pub body: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResponseEnvelope {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub fn cors_headers() -> HeaderMap {
    BTreeMap::from([(
        CORS_ALLOW_ORIGIN_HEADER.to_string(),
        CORS_ALLOW_ORIGIN_ANY.to_string(),
    )])
}

/// Envelope body for a successful invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SuccessBody {
    pub status: String,
    pub date: String,
    pub request_id: String,
    pub data_available: bool,
    pub execution_time_in_ms: u64,
    pub original_request: Value,
    pub data: Value,
}

/// Envelope body for a failed invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status: String,
    pub date: String,
    pub request_id: String,
    pub data_available: bool,
    pub execution_time_in_ms: u64,
    pub original_request: Value,
    pub error_message: String,
    pub error_name: String,
    pub error_data: Value,
}

/// Value produced by a user handler.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerResult {
    /// Bare value, wrapped into a success envelope as `data`.
    Plain(Value),
    Structured(StructuredResult),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructuredResult {
    #[serde(default)]
    pub response: Value,
    #[serde(default = "default_result_status")]
    pub status: String,
    /// Emit `response` as the raw body, bypassing the envelope.
    #[serde(default)]
    pub custom: bool,
    #[serde(default)]
    pub options: ResponseOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: HeaderMap,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub fn default_result_status() -> String {
    STATUS_SUCCESS.to_string()
}

impl HandlerResult {
    pub fn plain(value: impl Into<Value>) -> Self {
        Self::Plain(value.into())
    }

    pub fn structured(response: impl Into<Value>) -> Self {
        Self::Structured(StructuredResult {
            response: response.into(),
            status: default_result_status(),
            custom: false,
            options: ResponseOptions::default(),
        })
    }

    /// Raw passthrough response; the body is emitted without an envelope.
    pub fn custom(response: impl Into<Value>) -> Self {
        let mut result = Self::structured(response);
        if let Self::Structured(structured) = &mut result {
            structured.custom = true;
        }
        result
    }

    pub fn with_status(self, status: impl Into<String>) -> Self {
        self.map_structured(|structured| structured.status = status.into())
    }

    pub fn with_status_code(self, status_code: u16) -> Self {
        self.map_structured(|structured| structured.options.status_code = Some(status_code))
    }

    pub fn with_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.map_structured(|structured| {
            structured.options.headers.insert(name.into(), value.into());
        })
    }

    pub fn with_option(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.map_structured(|structured| {
            structured.options.extra.insert(key.into(), value.into());
        })
    }

    /// The value that ends up as `data` (or as the raw body for custom results).
    pub fn response(&self) -> &Value {
        match self {
            Self::Plain(value) => value,
            Self::Structured(structured) => &structured.response,
        }
    }

    fn map_structured(self, apply: impl FnOnce(&mut StructuredResult)) -> Self {
        let mut structured = match self {
            Self::Plain(value) => StructuredResult {
                response: value,
                status: default_result_status(),
                custom: false,
                options: ResponseOptions::default(),
            },
            Self::Structured(structured) => structured,
        };
        apply(&mut structured);
        Self::Structured(structured)
    }
}

impl TryFrom<Value> for HandlerResult {
    type Error = serde_json::Error;

    /// Objects carrying the `response` marker key are structured results;
    /// anything else is a plain value.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let is_structured = value
            .as_object()
            .map(|object| object.contains_key(STRUCTURED_RESULT_MARKER))
            .unwrap_or(false);

        if is_structured {
            serde_json::from_value(value).map(Self::Structured)
        } else {
            Ok(Self::Plain(value))
        }
    }
}

impl From<StructuredResult> for HandlerResult {
    fn from(value: StructuredResult) -> Self {
        Self::Structured(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_id_joins_log_stream_and_request_id() {
        let context = InvocationContext::new("2026/10/18/[$LATEST]abc", "req-1");
        assert_eq!(context.request_id(), "2026/10/18/[$LATEST]abc\\req-1");
    }

    #[test]
    fn event_treats_null_mappings_as_absent() {
        let event: InvocationEvent = serde_json::from_value(json!({
            "body": null,
            "queryStringParameters": null,
            "pathParameters": null,
            "headers": {"Host": "example.com"},
            "requestContext": {"authorizer": null},
            "resource": "/items"
        }))
        .expect("event should parse");

        assert!(event.body.is_none());
        assert!(event.query_string_parameters.is_none());
        assert!(!event.is_base64_encoded);
        assert!(event.authorizer().is_none());
        assert_eq!(
            event.headers.as_ref().and_then(|headers| headers.get("Host")),
            Some(&"example.com".to_string())
        );
    }

    #[test]
    fn json_result_with_marker_is_structured() {
        let result = HandlerResult::try_from(json!({
            "response": "test",
            "custom": true,
            "options": {
                "statusCode": 404,
                "headers": {"Content-Type": "image/png"},
                "isBase64Encoded": true
            }
        }))
        .expect("structured result should parse");

        let HandlerResult::Structured(structured) = result else {
            panic!("expected structured result");
        };
        assert!(structured.custom);
        assert_eq!(structured.status, "success");
        assert_eq!(structured.options.status_code, Some(404));
        assert_eq!(
            structured.options.headers.get("Content-Type"),
            Some(&"image/png".to_string())
        );
        assert_eq!(structured.options.extra.get("isBase64Encoded"), Some(&json!(true)));
    }

    #[test]
    fn json_result_without_marker_is_plain() {
        let result = HandlerResult::try_from(json!({"ok": 1})).expect("plain result");
        assert_eq!(result, HandlerResult::Plain(json!({"ok": 1})));

        let scalar = HandlerResult::try_from(json!(0)).expect("plain result");
        assert_eq!(scalar, HandlerResult::Plain(json!(0)));
    }

    #[test]
    fn malformed_structured_result_is_rejected() {
        let error = HandlerResult::try_from(json!({"response": 1, "custom": "yes"}))
            .expect_err("custom must be a boolean");
        assert!(error.to_string().contains("invalid type"));
    }

    #[test]
    fn builder_promotes_plain_result_to_structured() {
        let result = HandlerResult::plain(json!({"ok": 1})).with_status_code(201);
        let HandlerResult::Structured(structured) = result else {
            panic!("expected structured result");
        };
        assert_eq!(structured.response, json!({"ok": 1}));
        assert_eq!(structured.options.status_code, Some(201));
        assert!(!structured.custom);
    }

    #[test]
    fn context_payload_omits_missing_platform_fields() {
        let context = InvocationContext {
            function_name: Some("orders".to_string()),
            ..InvocationContext::new("stream", "req")
        };
        let value = context.to_payload_value();

        assert_eq!(value["requestId"], json!("stream\\req"));
        assert_eq!(value["functionName"], json!("orders"));
        assert!(value.get("deadlineMs").is_none());
    }

    #[test]
    fn envelope_header_lookup_is_case_insensitive() {
        let envelope = ResponseEnvelope {
            status_code: 200,
            headers: cors_headers(),
            body: String::new(),
            extra: Map::new(),
        };
        assert_eq!(envelope.header("access-control-allow-origin"), Some("*"));
    }
}
