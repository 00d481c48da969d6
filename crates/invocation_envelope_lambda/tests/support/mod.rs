#![allow(dead_code)]

pub mod events;

use invocation_envelope_lambda::runtime::contract::{InvocationContext, ResponseEnvelope};
use serde_json::Value;

/// Context whose composite request id is `1\1`.
pub fn context() -> InvocationContext {
    InvocationContext::new("1", "1")
}

pub fn body_json(response: &ResponseEnvelope) -> Value {
    serde_json::from_str(&response.body).expect("envelope body should be JSON")
}

/// Top-level keys of an envelope body, sorted.
pub fn body_keys(body: &Value) -> Vec<String> {
    let mut keys: Vec<String> = body
        .as_object()
        .expect("envelope body should be an object")
        .keys()
        .cloned()
        .collect();
    keys.sort();
    keys
}
