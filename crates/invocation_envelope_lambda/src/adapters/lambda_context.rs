use invocation_envelope_core::contract::InvocationContext;

/// Copies the correlation and timing fields the adapter needs out of the
/// Lambda runtime context.
pub fn invocation_context(context: &lambda_runtime::Context) -> InvocationContext {
    let config = &context.env_config;
    InvocationContext {
        log_stream_name: config.log_stream.clone(),
        aws_request_id: context.request_id.clone(),
        function_name: non_empty(&config.function_name),
        function_version: non_empty(&config.version),
        invoked_function_arn: non_empty(&context.invoked_function_arn),
        memory_limit_in_mb: u32::try_from(config.memory).ok().filter(|memory| *memory > 0),
        deadline_ms: Some(context.deadline).filter(|deadline| *deadline > 0),
        xray_trace_id: context.xray_trace_id.clone(),
    }
}

fn non_empty(value: &str) -> Option<String> {
    Some(value).filter(|value| !value.is_empty()).map(str::to_string)
}
