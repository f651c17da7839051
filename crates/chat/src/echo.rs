use {async_trait::async_trait, serde_json::json};

use {
    parlor_common::Result,
    parlor_messages::{RequestMessage, RequestPayload, ResponsePayload},
    parlor_runtime::Component,
};

use crate::policy::ChatPolicy;

/// Diagnostic policy that echoes the request envelope back as a table.
/// Useful for wiring checks; not meant for production conversations.
#[derive(Debug, Default)]
pub struct EchoPolicy;

impl EchoPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Component for EchoPolicy {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn finalize(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ChatPolicy for EchoPolicy {
    async fn respond(
        &self,
        conversation_id: &str,
        message: &RequestMessage,
    ) -> Result<ResponsePayload> {
        let RequestPayload::Text { text } = &message.payload else {
            return Ok(ResponsePayload::Fallback {
                reason: format!(
                    "the echo policy only handles text messages, got `{}`",
                    message.payload.kind()
                ),
                suggestion: "send a plain text message".into(),
            });
        };

        let scope = message.scope.map_or("none", |scope| scope.as_str());
        Ok(ResponsePayload::Table {
            title: format!("echo: {conversation_id}"),
            headers: vec!["Field".into(), "Value".into()],
            rows: vec![
                vec![json!("UUID"), json!(message.uuid)],
                vec![json!("Sender"), json!(message.sender_id)],
                vec![json!("Scope"), json!(scope)],
                vec![json!("Meta"), serde_json::Value::Object(message.meta.clone())],
                vec![json!("Echo"), serde_json::Value::Object(message.echo.clone())],
                vec![json!("Text"), json!(text)],
            ],
        })
    }
}
