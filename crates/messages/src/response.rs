use serde::{Deserialize, Serialize};

use crate::{MessageMap, request::RequestMessage, scope::MessageScope};

/// Outbound message envelope, produced by the dispatcher and drained by a
/// channel agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    /// Fresh id for this response.
    pub uuid: String,
    /// Equals the triggering request's `uuid`.
    pub ack_uuid: String,
    /// Equals the triggering request's `sender_id`.
    pub receiver_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<MessageScope>,
    #[serde(default)]
    pub meta: MessageMap,
    /// Copied verbatim from the request.
    #[serde(default)]
    pub echo: MessageMap,
    #[serde(flatten)]
    pub payload: ResponsePayload,
}

/// One selectable option of an options prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptOption {
    pub value: serde_json::Value,
    pub label: String,
}

/// Closed set of response payload variants. An unrecognized variant at a
/// seam is an integration error, never silently skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    Text {
        text: String,
    },
    Table {
        title: String,
        headers: Vec<String>,
        rows: Vec<Vec<serde_json::Value>>,
    },
    /// Sent whenever normal processing cannot produce a domain answer.
    Fallback {
        reason: String,
        suggestion: String,
    },
    /// Ask the user for a free-form value.
    InputPrompt {
        prompt: String,
        visible: bool,
        required: bool,
    },
    /// Ask the user to pick one of a fixed set of options.
    OptionsPrompt {
        prompt: String,
        options: Vec<PromptOption>,
    },
    /// Deliberately output nothing.
    Silence,
}

impl ResponsePayload {
    /// Variant tag, for logs and unsupported-type errors.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Table { .. } => "table",
            Self::Fallback { .. } => "fallback",
            Self::InputPrompt { .. } => "input_prompt",
            Self::OptionsPrompt { .. } => "options_prompt",
            Self::Silence => "silence",
        }
    }

    /// Plain-text rendition for channels that cannot display this variant.
    #[must_use]
    pub fn downgrade_text(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Table {
                title,
                headers,
                rows,
            } => {
                let mut lines = Vec::with_capacity(rows.len() + 2);
                if !title.is_empty() {
                    lines.push(title.clone());
                }
                lines.push(headers.join(" | "));
                for row in rows {
                    let cells: Vec<String> = row.iter().map(cell_text).collect();
                    lines.push(cells.join(" | "));
                }
                lines.join("\n")
            }
            Self::Fallback { reason, suggestion } => {
                if suggestion.is_empty() {
                    reason.clone()
                } else {
                    format!("{reason}\n{suggestion}")
                }
            }
            Self::InputPrompt { prompt, .. } | Self::OptionsPrompt { prompt, .. } => prompt.clone(),
            Self::Silence => String::new(),
        }
    }
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl ResponseMessage {
    /// Build the response to `request`, stamping every correlation field:
    /// fresh `uuid`, `ack_uuid = request.uuid`, `receiver_id =
    /// request.sender_id`, and `scope`/`meta`/`echo` copied from the request.
    #[must_use]
    pub fn reply_to(request: &RequestMessage, payload: ResponsePayload) -> Self {
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            ack_uuid: request.uuid.clone(),
            receiver_id: request.sender_id.clone(),
            scope: request.scope,
            meta: request.meta.clone(),
            echo: request.echo.clone(),
            payload,
        }
    }

    /// Correlated fallback response for a failed request.
    #[must_use]
    pub fn fallback_for(
        request: &RequestMessage,
        reason: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::reply_to(
            request,
            ResponsePayload::Fallback {
                reason: reason.into(),
                suggestion: suggestion.into(),
            },
        )
    }

    /// Same envelope with the payload replaced by its plain-text rendition.
    /// Used when a channel rejects the original variant.
    #[must_use]
    pub fn downgrade_to_text(&self) -> Self {
        Self {
            payload: ResponsePayload::Text {
                text: self.payload.downgrade_text(),
            },
            ..self.clone()
        }
    }
}
