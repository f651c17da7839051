//! Conversation dispatcher and the chat-policy seam.
//!
//! The dispatcher ([`ChatBot`]) pulls requests off the broker, serializes
//! processing per conversation key, invokes the configured [`ChatPolicy`],
//! and pushes correlated responses back. Policy failures become fallback
//! responses; broker and resolver failures drain the worker pool.

mod bot;
mod convo;
mod echo;
mod policy;

pub use {
    bot::ChatBot,
    convo::ConversationLocks,
    echo::EchoPolicy,
    policy::{ChatPolicy, builtin_policies},
};
