//! Lambda-oriented pipeline runner and handlers for invocation envelopes.
//!
//! This crate owns runtime integration details (the async transform/validate/
//! handle pipeline, the `lambda_runtime` bridge, logging and settings) and
//! exposes a single runtime module boundary for the contract, extraction,
//! failure and composition primitives.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod logging;

pub mod runtime {
    pub use invocation_envelope_core::{compose, contract, extract, failure, timing};
}
