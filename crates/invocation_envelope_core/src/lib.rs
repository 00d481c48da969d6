//! Invocation envelope contracts and deterministic request/response logic.
//!
//! This crate owns event extraction, failure normalization and envelope
//! composition. It intentionally excludes the async pipeline and Lambda
//! runtime concerns, which live in `invocation_envelope_lambda`.

pub mod compose;
pub mod contract;
pub mod extract;
pub mod failure;
pub mod timing;
