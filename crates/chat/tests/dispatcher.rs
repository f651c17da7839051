#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    tokio::sync::Barrier,
};

use {
    parlor_broker::{MemoryBroker, MemoryBrokerConfig, MessageBroker},
    parlor_chat::{ChatBot, ChatPolicy, EchoPolicy},
    parlor_common::{Error, Result},
    parlor_messages::{
        MessageScope, RequestMessage, RequestPayload, ResponseMessage, ResponsePayload,
    },
    parlor_runtime::{Component, PoolState, Runnable, WorkerPool},
};

fn memory_broker() -> Arc<MemoryBroker> {
    Arc::new(MemoryBroker::new(MemoryBrokerConfig {
        capacity: 64,
        consume_timeout_ms: 50,
        queue_name_prefix: String::new(),
    }))
}

fn request(uuid: &str, sender: &str, text: &str) -> RequestMessage {
    let mut request = RequestMessage::text(sender, text);
    request.uuid = uuid.into();
    request
}

/// Poll the response queue until a message arrives. The broker's consume
/// timeout bounds each attempt, so this gives up after a few seconds.
async fn next_response(broker: &MemoryBroker) -> ResponseMessage {
    for _ in 0..100 {
        match broker.consume_response().await {
            Ok(response) => return response,
            Err(Error::EmptyQueue) => {}
            Err(error) => panic!("consume_response failed: {error}"),
        }
    }
    panic!("no response arrived in time");
}

// ── Test policies ───────────────────────────────────────────────────────────

/// Replies with the request text; optionally fails or stalls first.
#[derive(Debug)]
struct ScriptedPolicy {
    delay: Duration,
    fail_with: Option<fn() -> Error>,
    max_overlap: AtomicUsize,
    in_flight: AtomicUsize,
}

impl ScriptedPolicy {
    fn new() -> Self {
        Self {
            delay: Duration::ZERO,
            fail_with: None,
            max_overlap: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn failing(mut self, fail_with: fn() -> Error) -> Self {
        self.fail_with = Some(fail_with);
        self
    }
}

#[async_trait]
impl Component for ScriptedPolicy {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn finalize(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ChatPolicy for ScriptedPolicy {
    async fn respond(
        &self,
        _conversation_id: &str,
        message: &RequestMessage,
    ) -> Result<ResponsePayload> {
        let concurrent = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_overlap.fetch_max(concurrent, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(fail) = self.fail_with {
            return Err(fail());
        }
        let text = match &message.payload {
            RequestPayload::Text { text } => text.clone(),
            other => format!("<{}>", other.kind()),
        };
        Ok(ResponsePayload::Text { text })
    }
}

/// Completes only when two invocations run at the same time.
#[derive(Debug)]
struct RendezvousPolicy {
    barrier: Barrier,
}

#[async_trait]
impl Component for RendezvousPolicy {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn finalize(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ChatPolicy for RendezvousPolicy {
    async fn respond(
        &self,
        _conversation_id: &str,
        _message: &RequestMessage,
    ) -> Result<ResponsePayload> {
        match tokio::time::timeout(Duration::from_secs(2), self.barrier.wait()).await {
            Ok(_) => Ok(ResponsePayload::Silence),
            Err(_elapsed) => Err(Error::policy("no concurrent peer arrived")),
        }
    }
}

/// Broker stub whose consume path dies with a critical error.
#[derive(Debug)]
struct DeadBroker;

#[async_trait]
impl Component for DeadBroker {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn finalize(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl MessageBroker for DeadBroker {
    async fn produce_request(&self, _message: RequestMessage) -> Result<()> {
        Err(Error::broker("connection lost"))
    }

    async fn consume_request(&self) -> Result<RequestMessage> {
        Err(Error::broker("connection lost"))
    }

    async fn produce_response(&self, _message: ResponseMessage) -> Result<()> {
        Err(Error::broker("connection lost"))
    }

    async fn consume_response(&self) -> Result<ResponseMessage> {
        Err(Error::broker("connection lost"))
    }
}

// ── Direct-call mode ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_chat_stamps_correlation_fields() {
    let broker = memory_broker();
    let bot = ChatBot::new(broker, Arc::new(EchoPolicy::new()));

    let mut message = request("42", "sender-1", "hello");
    message.echo.insert("ts".into(), serde_json::json!("1.23"));
    let response = bot.chat(&message.conversation_key(), &message).await;

    assert_eq!(response.ack_uuid, "42");
    assert_eq!(response.receiver_id, "sender-1");
    assert_eq!(response.echo, message.echo);
    assert_ne!(response.uuid, message.uuid);
}

#[tokio::test]
async fn test_policy_error_becomes_fallback() {
    let broker = memory_broker();
    let policy = ScriptedPolicy::new().failing(|| Error::policy("bad input"));
    let bot = ChatBot::new(broker, Arc::new(policy));

    let message = request("42", "u", "hi");
    let response = bot.chat("u-user", &message).await;

    assert_eq!(response.ack_uuid, "42");
    let ResponsePayload::Fallback { reason, .. } = &response.payload else {
        panic!("expected fallback, got {}", response.payload.kind());
    };
    assert_eq!(reason, "bad input");
}

#[tokio::test]
async fn test_policy_suggestion_reaches_fallback() {
    let broker = memory_broker();
    let policy =
        ScriptedPolicy::new().failing(|| Error::policy_with_suggestion("boom", "try later"));
    let bot = ChatBot::new(broker, Arc::new(policy));

    let response = bot.chat("u-user", &request("1", "u", "hi")).await;
    assert_eq!(
        response.payload,
        ResponsePayload::Fallback {
            reason: "boom".into(),
            suggestion: "try later".into(),
        }
    );
}

// ── Broker-driven mode ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_single_worker_acks_in_consume_order() {
    let broker = memory_broker();
    broker.initialize().await.unwrap();
    for uuid in ["1", "2", "3"] {
        broker
            .produce_request(request(uuid, "u", "hi"))
            .await
            .unwrap();
    }

    let bot = Arc::new(
        ChatBot::new(Arc::clone(&broker) as Arc<dyn MessageBroker>, Arc::new(EchoPolicy::new()))
            .with_idle_backoff(Duration::from_millis(10)),
    );
    let pool = Arc::new(WorkerPool::new(1));
    let run = tokio::spawn({
        let pool = Arc::clone(&pool);
        async move { pool.run(bot as Arc<dyn Runnable>).await }
    });

    for expected in ["1", "2", "3"] {
        let response = next_response(&broker).await;
        assert_eq!(response.ack_uuid, expected);
        assert_eq!(response.receiver_id, "u");
    }

    pool.cancel_token().cancel();
    run.await.unwrap().unwrap();
    assert_eq!(pool.state(), PoolState::Stopped);
}

#[tokio::test]
async fn test_same_conversation_never_overlaps() {
    let broker = memory_broker();
    broker.initialize().await.unwrap();
    for uuid in ["1", "2", "3", "4"] {
        broker
            .produce_request(request(uuid, "same-sender", "hi"))
            .await
            .unwrap();
    }

    let policy = Arc::new(ScriptedPolicy::new().with_delay(Duration::from_millis(20)));
    let bot = Arc::new(
        ChatBot::new(
            Arc::clone(&broker) as Arc<dyn MessageBroker>,
            Arc::clone(&policy) as Arc<dyn ChatPolicy>,
        )
        .with_idle_backoff(Duration::from_millis(10)),
    );
    let pool = Arc::new(WorkerPool::new(4));
    let run = tokio::spawn({
        let pool = Arc::clone(&pool);
        async move { pool.run(bot as Arc<dyn Runnable>).await }
    });

    let mut acks = Vec::new();
    for _ in 0..4 {
        acks.push(next_response(&broker).await.ack_uuid);
    }
    acks.sort();
    assert_eq!(acks, ["1", "2", "3", "4"]);
    assert_eq!(policy.max_overlap.load(Ordering::SeqCst), 1);

    pool.cancel_token().cancel();
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_distinct_conversations_run_in_parallel() {
    let broker = memory_broker();
    broker.initialize().await.unwrap();
    // Same sender, different scope: different conversation keys.
    let mut group = request("g", "u", "hi");
    group.scope = Some(MessageScope::Group);
    broker.produce_request(request("d", "u", "hi")).await.unwrap();
    broker.produce_request(group).await.unwrap();

    let bot = Arc::new(
        ChatBot::new(
            Arc::clone(&broker) as Arc<dyn MessageBroker>,
            Arc::new(RendezvousPolicy {
                barrier: Barrier::new(2),
            }),
        )
        .with_idle_backoff(Duration::from_millis(10)),
    );
    let pool = Arc::new(WorkerPool::new(2));
    let run = tokio::spawn({
        let pool = Arc::clone(&pool);
        async move { pool.run(bot as Arc<dyn Runnable>).await }
    });

    // Both respond with silence only if the two conversations were in the
    // policy at the same time; a serialized run times out at the barrier and
    // answers with a fallback instead.
    let first = next_response(&broker).await;
    let second = next_response(&broker).await;
    assert_eq!(first.payload.kind(), "silence");
    assert_eq!(second.payload.kind(), "silence");
    let mut acks = vec![first.ack_uuid, second.ack_uuid];
    acks.sort();
    assert_eq!(acks, ["d", "g"]);

    pool.cancel_token().cancel();
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_fatal_broker_error_drains_pool() {
    let bot = Arc::new(ChatBot::new(Arc::new(DeadBroker), Arc::new(EchoPolicy::new())));
    let pool = WorkerPool::new(3);

    // No external cancel: the dead broker's critical error must drain the
    // pool on its own.
    pool.run(bot as Arc<dyn Runnable>).await.unwrap();

    assert_eq!(pool.state(), PoolState::Stopped);
    assert!(pool.cancel_token().is_cancelled());
}

#[tokio::test]
async fn test_full_response_queue_is_not_fatal() {
    // Response capacity 1: the second response is dropped after a fallback
    // attempt, but the pool keeps running.
    let broker = Arc::new(MemoryBroker::new(MemoryBrokerConfig {
        capacity: 1,
        consume_timeout_ms: 30,
        queue_name_prefix: String::new(),
    }));
    broker.initialize().await.unwrap();
    // Capacity bounds both queues, so enqueue requests one at a time.
    broker.produce_request(request("1", "u", "hi")).await.unwrap();

    let bot = Arc::new(
        ChatBot::new(Arc::clone(&broker) as Arc<dyn MessageBroker>, Arc::new(EchoPolicy::new()))
            .with_idle_backoff(Duration::from_millis(10)),
    );
    let pool = Arc::new(WorkerPool::new(1));
    let run = tokio::spawn({
        let pool = Arc::clone(&pool);
        async move { pool.run(bot as Arc<dyn Runnable>).await }
    });

    // Let the first response land, filling the queue, then push a second
    // request whose response (and fallback) cannot fit.
    tokio::time::sleep(Duration::from_millis(100)).await;
    broker.produce_request(request("2", "u", "hi")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    // Only the first response fit; the worker is still alive.
    let first = next_response(&broker).await;
    assert_eq!(first.ack_uuid, "1");
    assert!(matches!(
        broker.consume_response().await.unwrap_err(),
        Error::EmptyQueue
    ));

    pool.cancel_token().cancel();
    run.await.unwrap().unwrap();
    assert_eq!(pool.state(), PoolState::Stopped);
}
