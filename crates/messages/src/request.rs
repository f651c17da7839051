use serde::{Deserialize, Serialize};

use crate::{MessageMap, scope::MessageScope};

/// Meta key carrying an optional routing hint that splits one sender's
/// traffic into independent conversations.
pub const CONVERSATION_TAG_KEY: &str = "conversation_tag";

/// Inbound message envelope, produced by a channel adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMessage {
    /// Correlation id; echoed back as `ack_uuid` on the response.
    pub uuid: String,
    pub sender_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<MessageScope>,
    /// Routing hints (e.g. `conversation_tag`). Mutable by adapters.
    #[serde(default)]
    pub meta: MessageMap,
    /// Opaque adapter state, round-tripped verbatim to the response.
    #[serde(default)]
    pub echo: MessageMap,
    #[serde(flatten)]
    pub payload: RequestPayload,
}

/// Closed set of request payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestPayload {
    Text {
        text: String,
    },
    File {
        #[serde(with = "crate::base64_bytes")]
        content: Vec<u8>,
        file_type: String,
        file_name: String,
    },
    /// Value the user supplied in reply to an input prompt.
    Input {
        value: serde_json::Value,
    },
}

impl RequestPayload {
    /// Variant tag, for logs and unsupported-type errors.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::File { .. } => "file",
            Self::Input { .. } => "input",
        }
    }
}

impl RequestMessage {
    /// Plain-text request with a fresh uuid and `User` scope.
    #[must_use]
    pub fn text(sender_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            sender_id: sender_id.into(),
            scope: Some(MessageScope::User),
            meta: MessageMap::new(),
            echo: MessageMap::new(),
            payload: RequestPayload::Text { text: text.into() },
        }
    }

    /// Derived key that serializes causally related messages:
    /// `sender_id[-scope][-conversation_tag]`, case-folded. Two requests map
    /// to the same key iff they must never be processed concurrently.
    #[must_use]
    pub fn conversation_key(&self) -> String {
        let mut key = self.sender_id.clone();
        if let Some(scope) = self.scope {
            key.push('-');
            key.push_str(scope.as_str());
        }
        if let Some(tag) = self
            .meta
            .get(CONVERSATION_TAG_KEY)
            .and_then(serde_json::Value::as_str)
        {
            key.push('-');
            key.push_str(tag);
        }
        key.to_lowercase()
    }
}
