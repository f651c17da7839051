use async_trait::async_trait;

use {
    parlor_common::Result,
    parlor_messages::{RequestMessage, ResponseMessage},
    parlor_runtime::Component,
};

/// Queueing contract between channel adapters and the dispatcher.
///
/// Delivery is at-least-once: a message is acknowledged when `consume`
/// hands it to the caller, so a crash between consumption and the end of
/// processing can duplicate work but never lose a message that was not
/// handed out. `initialize`/`finalize` (from [`Component`]) own connection
/// and queue topology; both are idempotent.
///
/// Implementations must tolerate concurrent produce/consume calls from all
/// worker tasks of one process.
#[async_trait]
pub trait MessageBroker: Component + std::fmt::Debug {
    /// Append a request to the request channel's tail.
    ///
    /// Fails with `FullQueue` (recoverable) at capacity and `Broker`
    /// (critical) when the channel is unusable.
    async fn produce_request(&self, message: RequestMessage) -> Result<()>;

    /// Remove and return the oldest request, blocking up to the backend's
    /// configured timeout. Fails with `EmptyQueue` (recoverable) when
    /// nothing arrives in time — never hangs indefinitely.
    async fn consume_request(&self) -> Result<RequestMessage>;

    /// Append a response to the response channel's tail.
    async fn produce_response(&self, message: ResponseMessage) -> Result<()>;

    /// Remove and return the oldest response, with the same timeout
    /// semantics as [`MessageBroker::consume_request`].
    async fn consume_response(&self) -> Result<ResponseMessage>;
}
