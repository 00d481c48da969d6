use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use lambda_runtime::LambdaEvent;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::adapters::hooks::{AdapterConfig, PipelineHooks};
use crate::adapters::lambda_context::invocation_context;
use crate::runtime::compose::{compose_failure, compose_success, EnvelopeMeta};
use crate::runtime::contract::{
    HandlerResult, InvocationContext, InvocationEvent, Payload, ResponseEnvelope,
};
use crate::runtime::extract::{enrich_payload, extract_payload, parse_event, ExtractError};
use crate::runtime::failure::Failure;
use crate::runtime::timing::InvocationClock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Extract,
    Transform,
    Validate,
    Handler,
    Compose,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Transform => "transform",
            Self::Validate => "validate",
            Self::Handler => "handler",
            Self::Compose => "compose",
        }
    }
}

/// What the pipeline produced before composition. `transformed` is kept
/// whenever transform succeeded, whatever happened afterwards.
struct PipelineOutcome {
    raw: Option<Payload>,
    transformed: Option<Payload>,
    result: Result<HandlerResult, (PipelineStage, Failure)>,
}

impl PipelineOutcome {
    fn failed(
        raw: Option<Payload>,
        transformed: Option<Payload>,
        stage: PipelineStage,
        failure: Failure,
    ) -> Self {
        Self {
            raw,
            transformed,
            result: Err((stage, failure)),
        }
    }
}

/// Wraps a user handler with event extraction, the transform/validate hooks
/// and envelope composition. Holds no per-invocation state, so one adapter
/// serves any number of concurrent invocations.
pub struct InvocationAdapter<H> {
    hooks: PipelineHooks,
    handler: H,
}

impl<H, Fut> InvocationAdapter<H>
where
    H: Fn(Payload) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HandlerResult, Failure>> + Send,
{
    pub fn new(handler: H) -> Self {
        Self::with_config(AdapterConfig::default(), handler)
    }

    pub fn with_config(config: AdapterConfig, handler: H) -> Self {
        Self {
            hooks: config.resolve(),
            handler,
        }
    }

    /// Runs one invocation. Always yields exactly one response; failures
    /// are rendered as error envelopes.
    pub async fn invoke(
        &self,
        event: InvocationEvent,
        context: &InvocationContext,
    ) -> ResponseEnvelope {
        let clock = InvocationClock::start();
        self.run(Ok(event), context, clock).await
    }

    /// Like [`invoke`](Self::invoke) for an undecoded event; an event that
    /// does not match the HTTP shape becomes a malformed-input error envelope.
    pub async fn invoke_raw(&self, event: Value, context: &InvocationContext) -> ResponseEnvelope {
        let clock = InvocationClock::start();
        self.run(parse_event(event), context, clock).await
    }

    /// Entry point for `lambda_runtime::service_fn`. Never returns `Err`.
    pub async fn handle_lambda_event(
        &self,
        event: LambdaEvent<Value>,
    ) -> Result<ResponseEnvelope, lambda_runtime::Error> {
        let context = invocation_context(&event.context);
        Ok(self.invoke_raw(event.payload, &context).await)
    }

    async fn run(
        &self,
        event: Result<InvocationEvent, ExtractError>,
        context: &InvocationContext,
        clock: InvocationClock,
    ) -> ResponseEnvelope {
        let request_id = context.request_id();
        debug!(request_id = %request_id, "invocation_started");

        let PipelineOutcome {
            raw,
            transformed,
            result,
        } = self.run_pipeline(event, context).await;

        let composed = match result {
            Ok(handler_result) => {
                let meta = EnvelopeMeta::new(&clock, &request_id, transformed.as_ref());
                compose_success(handler_result, &meta)
                    .map(|response| (response, meta.execution_time_in_ms))
                    .map_err(|failure| (PipelineStage::Compose, failure))
            }
            Err(failed) => Err(failed),
        };

        let (response, execution_time_ms) = match composed {
            Ok(composed) => composed,
            Err((stage, failure)) => {
                warn!(
                    request_id = %request_id,
                    stage = stage.as_str(),
                    error_name = failure.error_name(),
                    error_message = failure.error_message(),
                    "invocation_failed"
                );
                let original_request = match (transformed, raw) {
                    (Some(transformed), _) => Some(transformed),
                    (None, Some(raw)) => Some(self.recover_original_request(raw).await),
                    (None, None) => None,
                };
                let meta = EnvelopeMeta::new(&clock, &request_id, original_request.as_ref());
                (compose_failure(&failure, &meta), meta.execution_time_in_ms)
            }
        };

        info!(
            request_id = %request_id,
            status_code = response.status_code,
            execution_time_ms,
            "invocation_completed"
        );
        response
    }

    async fn run_pipeline(
        &self,
        event: Result<InvocationEvent, ExtractError>,
        context: &InvocationContext,
    ) -> PipelineOutcome {
        let event = match event {
            Ok(event) => event,
            Err(error) => {
                return PipelineOutcome::failed(None, None, PipelineStage::Extract, error.into())
            }
        };

        let raw = match extract_payload(&event) {
            Ok(raw) => raw,
            Err(error) => {
                return PipelineOutcome::failed(None, None, PipelineStage::Extract, error.into())
            }
        };

        let transformed = match guarded(self.hooks.transform(raw.clone())).await {
            Ok(transformed) => transformed,
            Err(failure) => {
                return PipelineOutcome::failed(Some(raw), None, PipelineStage::Transform, failure)
            }
        };

        // Validation sees the pre-transform payload.
        if let Err(failure) = guarded(self.hooks.validate(raw.clone())).await {
            return PipelineOutcome::failed(
                Some(raw),
                Some(transformed),
                PipelineStage::Validate,
                failure,
            );
        }

        let enriched = enrich_payload(&raw, &event, context);
        let result = guarded(async { (self.handler)(enriched).await })
            .await
            .map_err(|failure| (PipelineStage::Handler, failure));

        PipelineOutcome {
            raw: Some(raw),
            transformed: Some(transformed),
            result,
        }
    }

    /// Re-runs transform for the error envelope. Falls back to the raw
    /// payload when transform fails again.
    async fn recover_original_request(&self, raw: Payload) -> Payload {
        match guarded(self.hooks.transform(raw.clone())).await {
            Ok(transformed) => transformed,
            Err(failure) => {
                warn!(
                    error_name = failure.error_name(),
                    error_message = failure.error_message(),
                    "transform_recovery_failed"
                );
                raw
            }
        }
    }
}

/// Awaits a stage, turning a panic raised while polling it into a failure.
async fn guarded<T>(stage: impl Future<Output = Result<T, Failure>>) -> Result<T, Failure> {
    AssertUnwindSafe(stage)
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(Failure::from_panic(payload)))
}
