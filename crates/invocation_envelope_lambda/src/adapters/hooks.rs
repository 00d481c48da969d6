use std::future::{ready, Future};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use invocation_envelope_core::contract::Payload;
use invocation_envelope_core::failure::Failure;

pub type TransformHook =
    Arc<dyn Fn(Payload) -> BoxFuture<'static, Result<Payload, Failure>> + Send + Sync>;
pub type ValidateHook =
    Arc<dyn Fn(Payload) -> BoxFuture<'static, Result<(), Failure>> + Send + Sync>;

/// Adapter configuration, fixed at construction time. Each hook is optional
/// and defaults independently when resolved.
#[derive(Clone, Default)]
pub struct AdapterConfig {
    pub transform: Option<TransformHook>,
    pub validate: Option<ValidateHook>,
}

impl AdapterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transform<F, Fut>(mut self, transform: F) -> Self
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload, Failure>> + Send + 'static,
    {
        let hook: TransformHook = Arc::new(move |payload: Payload| transform(payload).boxed());
        self.transform = Some(hook);
        self
    }

    pub fn with_transform_fn<F>(self, transform: F) -> Self
    where
        F: Fn(Payload) -> Result<Payload, Failure> + Send + Sync + 'static,
    {
        self.with_transform(move |payload| ready(transform(payload)))
    }

    pub fn with_validate<F, Fut>(mut self, validate: F) -> Self
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Failure>> + Send + 'static,
    {
        let hook: ValidateHook = Arc::new(move |payload: Payload| validate(payload).boxed());
        self.validate = Some(hook);
        self
    }

    pub fn with_validate_fn<F>(self, validate: F) -> Self
    where
        F: Fn(&Payload) -> Result<(), Failure> + Send + Sync + 'static,
    {
        self.with_validate(move |payload| ready(validate(&payload)))
    }

    /// Overlays `overrides` on `self`; hooks present in `overrides` win.
    pub fn merge(self, overrides: AdapterConfig) -> Self {
        Self {
            transform: overrides.transform.or(self.transform),
            validate: overrides.validate.or(self.validate),
        }
    }

    /// Fills missing hooks with identity transform and always-pass validation.
    pub fn resolve(self) -> PipelineHooks {
        PipelineHooks {
            transform: self.transform.unwrap_or_else(identity_transform),
            validate: self.validate.unwrap_or_else(accept_all),
        }
    }
}

impl std::fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("transform", &self.transform.is_some())
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

/// Resolved hooks used by the pipeline runner.
#[derive(Clone)]
pub struct PipelineHooks {
    transform: TransformHook,
    validate: ValidateHook,
}

impl PipelineHooks {
    pub async fn transform(&self, payload: Payload) -> Result<Payload, Failure> {
        (self.transform)(payload).await
    }

    pub async fn validate(&self, payload: Payload) -> Result<(), Failure> {
        (self.validate)(payload).await
    }
}

impl Default for PipelineHooks {
    fn default() -> Self {
        AdapterConfig::default().resolve()
    }
}

fn identity_transform() -> TransformHook {
    Arc::new(|payload: Payload| ready(Ok(payload)).boxed())
}

fn accept_all() -> ValidateHook {
    Arc::new(|_payload: Payload| ready(Ok(())).boxed())
}
