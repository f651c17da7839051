//! Message broker contract and the built-in in-memory backend.
//!
//! A broker exposes two independent, ordered, at-least-once channels —
//! request and response — behind [`MessageBroker`]. External backends (e.g.
//! AMQP) satisfy the same trait and are mounted through the registry seam
//! in [`builtin_registry`]; their transport is out of scope here.

mod broker;
mod memory;
mod registry;

pub use {
    broker::MessageBroker,
    memory::{MemoryBroker, MemoryBrokerConfig},
    registry::builtin_registry,
};
