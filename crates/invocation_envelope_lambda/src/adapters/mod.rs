pub mod hooks;
pub mod lambda_context;
