//! Channel agents: the egress seam back to chat platforms.
//!
//! A [`ChannelAgent`] knows how to deliver one platform's messages; the
//! [`ChannelRelay`] drains the broker's response channel and hands each
//! response to the agent, downgrading payload variants the platform cannot
//! render. Inbound webhook endpoints live outside this crate.

mod agent;
mod console;
mod relay;

pub use {
    agent::{ChannelAgent, builtin_agents},
    console::{ConsoleAgent, render_text},
    relay::ChannelRelay,
};
