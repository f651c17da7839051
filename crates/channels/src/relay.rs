//! Drains the broker's response channel back to a platform.

use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    tracing::{debug, info, warn},
};

use {
    parlor_broker::MessageBroker,
    parlor_common::{Error, Result},
    parlor_messages::ResponseMessage,
    parlor_runtime::{Component, Runnable, WorkerContext},
};

use crate::agent::ChannelAgent;

const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_secs(1);

/// Worker-pool runnable that consumes responses and delivers them through a
/// [`ChannelAgent`].
pub struct ChannelRelay {
    broker: Arc<dyn MessageBroker>,
    agent: Arc<dyn ChannelAgent>,
    idle_backoff: Duration,
}

impl ChannelRelay {
    #[must_use]
    pub fn new(broker: Arc<dyn MessageBroker>, agent: Arc<dyn ChannelAgent>) -> Self {
        Self {
            broker,
            agent,
            idle_backoff: DEFAULT_IDLE_BACKOFF,
        }
    }

    #[must_use]
    pub fn with_idle_backoff(mut self, idle_backoff: Duration) -> Self {
        self.idle_backoff = idle_backoff;
        self
    }

    async fn deliver(&self, message: &ResponseMessage) -> Result<()> {
        match self.agent.send_message(message).await {
            Err(Error::UnsupportedMessageType { kind }) => {
                debug!(
                    uuid = %message.uuid,
                    kind,
                    "channel cannot render variant; downgrading to text"
                );
                self.agent.send_message(&message.downgrade_to_text()).await
            }
            other => other,
        }
    }
}

#[async_trait]
impl Runnable for ChannelRelay {
    async fn startup(&self) -> Result<()> {
        self.broker.initialize().await?;
        self.agent.initialize().await?;
        info!("channel relay ready");
        Ok(())
    }

    async fn run_once(&self, ctx: &WorkerContext) -> Result<()> {
        let message = match self.broker.consume_response().await {
            Ok(message) => message,
            Err(Error::EmptyQueue) => {
                debug!(worker = ctx.number, "no response message to process");
                ctx.idle(self.idle_backoff).await;
                return Ok(());
            }
            Err(consume_error) => return Err(consume_error),
        };

        if let Err(send_error) = self.deliver(&message).await {
            if send_error.is_critical() {
                return Err(send_error);
            }
            // The response cannot be re-queued without breaking at-least-once
            // accounting on the platform side; log and move on.
            warn!(uuid = %message.uuid, %send_error, "failed to deliver response");
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.agent.finalize().await?;
        self.broker.finalize().await?;
        info!("channel relay stopped");
        Ok(())
    }
}
