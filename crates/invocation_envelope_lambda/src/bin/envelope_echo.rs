use invocation_envelope_lambda::adapters::hooks::AdapterConfig;
use invocation_envelope_lambda::config::RuntimeSettings;
use invocation_envelope_lambda::handlers::pipeline::InvocationAdapter;
use invocation_envelope_lambda::logging;
use invocation_envelope_lambda::runtime::contract::{HandlerResult, Payload};
use invocation_envelope_lambda::runtime::failure::Failure;
use lambda_runtime::{service_fn, Error};
use serde_json::Value;

const REDACTED_FIELDS: [&str; 2] = ["password", "token"];

/// Keeps credentials out of `originalRequest`.
fn redact(mut payload: Payload) -> Result<Payload, Failure> {
    for field in REDACTED_FIELDS {
        if payload.contains_key(field) {
            payload.insert(field.to_string(), Value::from("[redacted]"));
        }
    }
    Ok(payload)
}

async fn echo(payload: Payload) -> Result<HandlerResult, Failure> {
    Ok(HandlerResult::plain(Value::Object(payload)))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let settings = RuntimeSettings::from_env()?;
    logging::init(&settings);

    let adapter =
        InvocationAdapter::with_config(AdapterConfig::new().with_transform_fn(redact), echo);
    let adapter = &adapter;

    lambda_runtime::run(service_fn(move |event| async move {
        adapter.handle_lambda_event(event).await
    }))
    .await
}
