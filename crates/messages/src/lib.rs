//! Message envelopes exchanged between channel adapters, the broker, and the
//! chat dispatcher.
//!
//! All envelopes are JSON-serializable value objects. A request is created at
//! the ingress boundary; the matching response is created by the dispatcher
//! through [`ResponseMessage::reply_to`], which is the only place correlation
//! fields (`ack_uuid`, `receiver_id`, `echo`, …) are stamped.

mod base64_bytes;
mod request;
mod response;
mod scope;

pub use {
    request::{RequestMessage, RequestPayload},
    response::{PromptOption, ResponseMessage, ResponsePayload},
    scope::MessageScope,
};

/// JSON object used for the `meta` and `echo` envelope fields.
pub type MessageMap = serde_json::Map<String, serde_json::Value>;
