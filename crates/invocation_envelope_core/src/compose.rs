use serde_json::{Map, Value};

use crate::contract::{
    cors_headers, ErrorBody, HandlerResult, Payload, ResponseEnvelope, StructuredResult,
    SuccessBody, DEFAULT_SUCCESS_STATUS_CODE, RESERVED_RESPONSE_KEYS, STATUS_ERROR,
    STATUS_SUCCESS,
};
use crate::failure::Failure;
use crate::timing::InvocationClock;

/// Metadata shared by success and error envelopes of one invocation.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeMeta<'a> {
    pub clock: &'a InvocationClock,
    /// Reading of `clock` taken when the meta was built; the envelope and
    /// the completion log both report this value.
    pub execution_time_in_ms: u64,
    pub request_id: &'a str,
    /// Transformed payload; `None` when extraction itself failed.
    pub original_request: Option<&'a Payload>,
}

impl<'a> EnvelopeMeta<'a> {
    pub fn new(
        clock: &'a InvocationClock,
        request_id: &'a str,
        original_request: Option<&'a Payload>,
    ) -> Self {
        Self {
            clock,
            execution_time_in_ms: clock.elapsed_ms(),
            request_id,
            original_request,
        }
    }

    fn original_request_value(&self) -> Value {
        self.original_request
            .cloned()
            .map(Value::Object)
            .unwrap_or(Value::Null)
    }
}

/// Maps a handler result to the emitted response. Fails only when the
/// envelope body cannot be serialized.
pub fn compose_success(
    result: HandlerResult,
    meta: &EnvelopeMeta<'_>,
) -> Result<ResponseEnvelope, Failure> {
    match result {
        HandlerResult::Structured(structured) if structured.custom => {
            Ok(compose_custom(structured))
        }
        HandlerResult::Structured(structured) => {
            compose_envelope(structured.status, structured.response, meta)
        }
        HandlerResult::Plain(value) => compose_envelope(STATUS_SUCCESS.to_string(), value, meta),
    }
}

fn compose_envelope(
    status: String,
    data: Value,
    meta: &EnvelopeMeta<'_>,
) -> Result<ResponseEnvelope, Failure> {
    let body = SuccessBody {
        status,
        date: meta.clock.date(),
        request_id: meta.request_id.to_string(),
        data_available: !data.is_null(),
        execution_time_in_ms: meta.execution_time_in_ms,
        original_request: meta.original_request_value(),
        data,
    };

    Ok(ResponseEnvelope {
        status_code: DEFAULT_SUCCESS_STATUS_CODE,
        headers: cors_headers(),
        body: serde_json::to_string(&body)?,
        extra: Map::new(),
    })
}

fn compose_custom(structured: StructuredResult) -> ResponseEnvelope {
    let options = structured.options;
    let mut headers = cors_headers();
    headers.extend(options.headers);

    let extra = options
        .extra
        .into_iter()
        .filter(|(key, _)| !RESERVED_RESPONSE_KEYS.contains(&key.as_str()))
        .collect();

    ResponseEnvelope {
        status_code: options.status_code.unwrap_or(DEFAULT_SUCCESS_STATUS_CODE),
        headers,
        body: raw_body(structured.response),
        extra,
    }
}

/// Custom bodies are emitted as-is: strings verbatim, `null` as empty, any
/// other value in its JSON text form.
fn raw_body(response: Value) -> String {
    match response {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Maps a failure from any stage to the error envelope. Never fails.
pub fn compose_failure(failure: &Failure, meta: &EnvelopeMeta<'_>) -> ResponseEnvelope {
    let mut headers = cors_headers();
    headers.extend(failure.headers().clone());

    let mut body = ErrorBody {
        status: STATUS_ERROR.to_string(),
        date: meta.clock.date(),
        request_id: meta.request_id.to_string(),
        data_available: false,
        execution_time_in_ms: meta.execution_time_in_ms,
        original_request: meta.original_request_value(),
        error_message: failure.error_message().to_string(),
        error_name: failure.error_name().to_string(),
        error_data: failure.error_data(),
    };

    let encoded = match serde_json::to_string(&body) {
        Ok(encoded) => encoded,
        Err(_) => {
            body.original_request = Value::Null;
            body.error_data = Value::Null;
            serde_json::to_string(&body).unwrap_or_default()
        }
    };

    ResponseEnvelope {
        status_code: failure.status_code(),
        headers,
        body: encoded,
        extra: Map::new(),
    }
}
