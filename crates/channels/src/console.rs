//! Terminal delivery, for local runs and wiring checks.

use async_trait::async_trait;

use {
    parlor_common::Result,
    parlor_messages::{ResponseMessage, ResponsePayload},
    parlor_runtime::Component,
};

use crate::agent::ChannelAgent;

/// Render a response for a plain-text surface. `None` means deliberately
/// print nothing (silence).
#[must_use]
pub fn render_text(message: &ResponseMessage) -> Option<String> {
    match &message.payload {
        ResponsePayload::Silence => None,
        ResponsePayload::Fallback { reason, suggestion } => {
            let mut text = format!("error: {reason}");
            if !suggestion.is_empty() {
                text.push('\n');
                text.push_str(suggestion);
            }
            Some(text)
        }
        other => Some(other.downgrade_text()),
    }
}

/// Channel agent that writes rendered responses to stdout.
#[derive(Debug, Default)]
pub struct ConsoleAgent;

impl ConsoleAgent {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Component for ConsoleAgent {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn finalize(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAgent for ConsoleAgent {
    async fn send_message(&self, message: &ResponseMessage) -> Result<()> {
        if let Some(text) = render_text(message) {
            println!("[{}] {text}", message.receiver_id);
        }
        Ok(())
    }
}
