use std::sync::Arc;

use {async_trait::async_trait, serde_json::Value};

use {
    parlor_common::{Registry, Result},
    parlor_messages::ResponseMessage,
    parlor_runtime::Component,
};

use crate::console::ConsoleAgent;

/// Delivers responses to one platform's send API.
///
/// An agent that cannot render a payload variant fails with
/// `UnsupportedMessageType`; the relay then retries with the text-downgraded
/// envelope. Everything else the agent reports is treated per the shared
/// taxonomy (critical errors drain the process).
#[async_trait]
pub trait ChannelAgent: Component + std::fmt::Debug {
    async fn send_message(&self, message: &ResponseMessage) -> Result<()>;
}

/// Registry of built-in channel agents. Platform agents (Slack, DingTalk,
/// …) register here at startup.
#[must_use]
pub fn builtin_agents() -> Registry<dyn ChannelAgent> {
    let mut registry = Registry::new();
    registry.register("console", |_args: &Value| {
        Ok(Arc::new(ConsoleAgent::new()) as Arc<dyn ChannelAgent>)
    });
    registry
}
