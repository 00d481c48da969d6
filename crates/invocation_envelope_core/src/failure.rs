use std::any::Any;
use std::collections::BTreeMap;

use serde_json::Value;

use crate::contract::{
    HeaderMap, DEFAULT_ERROR_STATUS_CODE, UNKNOWN_ERROR_MESSAGE, UNKNOWN_ERROR_NAME,
};
use crate::extract::ExtractError;

pub const MALFORMED_INPUT_ERROR_NAME: &str = "MalformedInput";
pub const PANIC_ERROR_NAME: &str = "Panic";
pub const GENERIC_ERROR_NAME: &str = "Error";

/// Normalized failure raised by any pipeline stage.
///
/// Every field is optional so that failures of any origin (Rust errors,
/// rejected JSON values, panics) share one shape. Missing fields fall back to
/// the unknown-error defaults when rendered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Failure {
    message: Option<String>,
    name: Option<String>,
    data: Option<Value>,
    status_code: Option<u16>,
    headers: HeaderMap,
}

impl Failure {
    /// Failure named `Error` with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::unknown()
            .with_name(GENERIC_ERROR_NAME)
            .with_message(message)
    }

    /// Failure with no message and no name.
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = non_empty(message.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = non_empty(name.into());
        self
    }

    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into()).filter(is_truthy);
        self
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Normalizes an arbitrary rejected value. Only objects can carry
    /// `message`, `name`, `data`, `statusCode` and `headers`; any other value
    /// (including a bare string) normalizes to an unknown failure.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(object) = value else {
            return Self::unknown();
        };

        let text_field = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .and_then(|text| non_empty(text.to_string()))
        };

        let headers = object
            .get("headers")
            .and_then(Value::as_object)
            .map(|headers| {
                headers
                    .iter()
                    .filter_map(|(name, value)| {
                        value.as_str().map(|value| (name.clone(), value.to_string()))
                    })
                    .collect::<BTreeMap<_, _>>()
            })
            .unwrap_or_default();

        Self {
            message: text_field("message"),
            name: text_field("name"),
            data: object.get("data").filter(|data| is_truthy(data)).cloned(),
            status_code: object
                .get("statusCode")
                .and_then(Value::as_u64)
                .and_then(|code| u16::try_from(code).ok()),
            headers,
        }
    }

    /// Wraps any Rust error; the message is its display text.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        Self::new(error.to_string())
    }

    /// Converts a payload caught from a panicking stage.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|message| message.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned());

        let failure = Self::unknown().with_name(PANIC_ERROR_NAME);
        match message {
            Some(message) => failure.with_message(message),
            None => failure,
        }
    }

    pub fn error_message(&self) -> &str {
        self.message.as_deref().unwrap_or(UNKNOWN_ERROR_MESSAGE)
    }

    pub fn error_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_ERROR_NAME)
    }

    /// Attached data, or `null`.
    pub fn error_data(&self) -> Value {
        self.data.clone().unwrap_or(Value::Null)
    }

    pub fn status_code(&self) -> u16 {
        self.status_code.unwrap_or(DEFAULT_ERROR_STATUS_CODE)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

fn non_empty(text: String) -> Option<String> {
    Some(text).filter(|text| !text.is_empty())
}

/// `null`, `false`, zero and `""` carry no data; objects and arrays always do.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|number| number != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_name(), self.error_message())
    }
}

impl std::error::Error for Failure {}

impl From<ExtractError> for Failure {
    fn from(error: ExtractError) -> Self {
        Self::unknown()
            .with_name(MALFORMED_INPUT_ERROR_NAME)
            .with_message(error.to_string())
    }
}

impl From<serde_json::Error> for Failure {
    fn from(error: serde_json::Error) -> Self {
        Self::from_error(&error)
    }
}

/// Boxed errors as produced by `lambda_runtime` and most async clients.
impl From<Box<dyn std::error::Error + Send + Sync>> for Failure {
    fn from(error: Box<dyn std::error::Error + Send + Sync>) -> Self {
        match error.downcast::<Failure>() {
            Ok(failure) => *failure,
            Err(error) => Self::new(error.to_string()),
        }
    }
}
