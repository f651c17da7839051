//! The conversation dispatcher.

use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    tracing::{debug, error, info, warn},
};

use {
    parlor_broker::MessageBroker,
    parlor_common::{Error, Result},
    parlor_messages::{RequestMessage, ResponseMessage},
    parlor_runtime::{Component, Runnable, WorkerContext},
};

use crate::{convo::ConversationLocks, policy::ChatPolicy};

const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_secs(1);

/// Consumes requests, serializes per conversation, invokes the policy, and
/// produces correlated responses.
///
/// Two entry points: [`ChatBot::chat`] for direct (standalone) calls, and
/// the [`Runnable`] impl for broker-driven operation under a worker pool.
pub struct ChatBot {
    broker: Arc<dyn MessageBroker>,
    policy: Arc<dyn ChatPolicy>,
    locks: ConversationLocks,
    idle_backoff: Duration,
}

impl ChatBot {
    #[must_use]
    pub fn new(broker: Arc<dyn MessageBroker>, policy: Arc<dyn ChatPolicy>) -> Self {
        Self {
            broker,
            policy,
            locks: ConversationLocks::default(),
            idle_backoff: DEFAULT_IDLE_BACKOFF,
        }
    }

    /// Backoff slept by a worker when the request queue is empty.
    #[must_use]
    pub fn with_idle_backoff(mut self, idle_backoff: Duration) -> Self {
        self.idle_backoff = idle_backoff;
        self
    }

    /// Ceiling of the conversation-lock table.
    #[must_use]
    pub fn with_lock_ceiling(mut self, max_entries: usize) -> Self {
        self.locks = ConversationLocks::new(max_entries);
        self
    }

    /// Invoke the policy and wrap its output in a correlated envelope. A
    /// policy error (or any panic-free failure it reports) becomes a
    /// fallback response — it never escapes.
    async fn respond(&self, conversation_id: &str, message: &RequestMessage) -> ResponseMessage {
        match self.policy.respond(conversation_id, message).await {
            Ok(payload) => ResponseMessage::reply_to(message, payload),
            Err(policy_error) => {
                error!(
                    conversation_id,
                    uuid = %message.uuid,
                    %policy_error,
                    "policy failed; falling back"
                );
                ResponseMessage::fallback_for(
                    message,
                    policy_error.reason(),
                    policy_error.suggestion().unwrap_or_default(),
                )
            }
        }
    }

    /// Direct-call mode: process one request under its conversation lock and
    /// return the response to the caller instead of the broker.
    pub async fn chat(
        &self,
        conversation_id: &str,
        message: &RequestMessage,
    ) -> ResponseMessage {
        let lock = self.locks.acquire(conversation_id);
        let _guard = lock.lock().await;
        self.respond(conversation_id, message).await
    }

    /// Broker-driven processing of one consumed request. Holds the
    /// conversation lock across both the policy call and the response
    /// produce, so concurrent workers never interleave one conversation.
    async fn dispatch(&self, message: &RequestMessage) -> Result<()> {
        let conversation_id = message.conversation_key();
        let lock = self.locks.acquire(&conversation_id);
        let _guard = lock.lock().await;
        debug!(conversation_id = %conversation_id, uuid = %message.uuid, "dispatching request");
        let response = self.respond(&conversation_id, message).await;
        self.broker.produce_response(response).await
    }
}

#[async_trait]
impl Runnable for ChatBot {
    async fn startup(&self) -> Result<()> {
        self.broker.initialize().await?;
        self.policy.initialize().await?;
        info!("chat dispatcher ready");
        Ok(())
    }

    async fn run_once(&self, ctx: &WorkerContext) -> Result<()> {
        let message = match self.broker.consume_request().await {
            Ok(message) => message,
            Err(Error::EmptyQueue) => {
                debug!(worker = ctx.number, "no request message to process");
                ctx.idle(self.idle_backoff).await;
                return Ok(());
            }
            Err(consume_error) => return Err(consume_error),
        };

        if let Err(dispatch_error) = self.dispatch(&message).await {
            if dispatch_error.is_critical() {
                return Err(dispatch_error);
            }
            warn!(uuid = %message.uuid, %dispatch_error, "dispatch failed; emitting fallback");
            let fallback = ResponseMessage::fallback_for(
                &message,
                dispatch_error.reason(),
                dispatch_error.suggestion().unwrap_or_default(),
            );
            if let Err(produce_error) = self.broker.produce_response(fallback).await {
                if produce_error.is_critical() {
                    return Err(produce_error);
                }
                warn!(uuid = %message.uuid, %produce_error, "dropping fallback response");
            }
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.policy.finalize().await?;
        self.broker.finalize().await?;
        info!("chat dispatcher stopped");
        Ok(())
    }
}
