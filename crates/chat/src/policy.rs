use std::sync::Arc;

use {async_trait::async_trait, serde_json::Value};

use {
    parlor_common::{Registry, Result},
    parlor_messages::{RequestMessage, ResponsePayload},
    parlor_runtime::Component,
};

use crate::echo::EchoPolicy;

/// Response-generating policy invoked once per request, under the
/// conversation lock.
///
/// A policy produces only the payload; the dispatcher owns the envelope and
/// stamps every correlation field. Errors returned here are downgraded to
/// fallback responses — a policy can never take down a worker.
#[async_trait]
pub trait ChatPolicy: Component + std::fmt::Debug {
    async fn respond(
        &self,
        conversation_id: &str,
        message: &RequestMessage,
    ) -> Result<ResponsePayload>;
}

/// Registry of built-in chat policies. Real model-backed policies are added
/// through [`Registry::register`] at startup.
#[must_use]
pub fn builtin_policies() -> Registry<dyn ChatPolicy> {
    let mut registry = Registry::new();
    registry.register("echo", |_args: &Value| {
        Ok(Arc::new(EchoPolicy::new()) as Arc<dyn ChatPolicy>)
    });
    registry
}
