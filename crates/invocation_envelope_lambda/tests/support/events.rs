use std::collections::BTreeMap;

use invocation_envelope_lambda::runtime::contract::InvocationEvent;

pub const POST_BODY: &str = r#"{"name":"widget","quantity":3,"tags":["a","b"]}"#;

fn api_gateway_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("Accept".to_string(), "*/*".to_string()),
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Host".to_string(), "abc123.execute-api.eu-west-1.amazonaws.com".to_string()),
        ("X-Forwarded-Proto".to_string(), "https".to_string()),
    ])
}

/// API Gateway GET event with query and path parameters and no body.
pub fn get_request_event() -> InvocationEvent {
    InvocationEvent {
        query_string_parameters: Some(BTreeMap::from([
            ("param1".to_string(), "value1".to_string()),
            ("param2".to_string(), "value2".to_string()),
        ])),
        path_parameters: Some(BTreeMap::from([("id".to_string(), "from-path".to_string())])),
        headers: Some(api_gateway_headers()),
        ..InvocationEvent::default()
    }
}

/// API Gateway POST event with a JSON body and ignored query parameters.
pub fn post_request_event() -> InvocationEvent {
    InvocationEvent {
        body: Some(POST_BODY.to_string()),
        query_string_parameters: Some(BTreeMap::from([(
            "ignored".to_string(),
            "true".to_string(),
        )])),
        headers: Some(api_gateway_headers()),
        ..InvocationEvent::default()
    }
}
