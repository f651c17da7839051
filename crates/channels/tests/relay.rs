#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;

use {
    parlor_broker::{MemoryBroker, MemoryBrokerConfig, MessageBroker},
    parlor_channels::{ChannelAgent, ChannelRelay},
    parlor_common::{Error, Result},
    parlor_messages::{RequestMessage, ResponseMessage, ResponsePayload},
    parlor_runtime::{Component, PoolState, Runnable, WorkerPool},
};

/// Agent that only accepts plain text, like most chat send APIs.
#[derive(Debug, Default)]
struct TextOnlyAgent {
    delivered: Mutex<Vec<String>>,
}

impl TextOnlyAgent {
    fn delivered(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Component for TextOnlyAgent {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn finalize(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAgent for TextOnlyAgent {
    async fn send_message(&self, message: &ResponseMessage) -> Result<()> {
        let ResponsePayload::Text { text } = &message.payload else {
            return Err(Error::unsupported(message.payload.kind()));
        };
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.clone());
        Ok(())
    }
}

fn broker() -> Arc<MemoryBroker> {
    Arc::new(MemoryBroker::new(MemoryBrokerConfig {
        capacity: 16,
        consume_timeout_ms: 30,
        queue_name_prefix: String::new(),
    }))
}

async fn run_relay(broker: Arc<MemoryBroker>, agent: Arc<TextOnlyAgent>, for_ms: u64) {
    let relay = Arc::new(
        ChannelRelay::new(broker as Arc<dyn MessageBroker>, agent as Arc<dyn ChannelAgent>)
            .with_idle_backoff(Duration::from_millis(10)),
    );
    let pool = WorkerPool::new(1);
    let token = pool.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(for_ms)).await;
        token.cancel();
    });
    pool.run(relay as Arc<dyn Runnable>).await.unwrap();
    assert_eq!(pool.state(), PoolState::Stopped);
}

#[tokio::test]
async fn test_relay_delivers_text_responses() {
    let broker = broker();
    broker.initialize().await.unwrap();
    let request = RequestMessage::text("u", "hi");
    let response = ResponseMessage::reply_to(
        &request,
        ResponsePayload::Text {
            text: "pong".into(),
        },
    );
    broker.produce_response(response).await.unwrap();

    let agent = Arc::new(TextOnlyAgent::default());
    run_relay(Arc::clone(&broker), Arc::clone(&agent), 150).await;

    assert_eq!(agent.delivered(), ["pong"]);
}

#[tokio::test]
async fn test_unsupported_variant_is_downgraded_to_text() {
    let broker = broker();
    broker.initialize().await.unwrap();
    let request = RequestMessage::text("u", "hi");
    let response = ResponseMessage::reply_to(
        &request,
        ResponsePayload::Table {
            title: String::new(),
            headers: vec!["k".into(), "v".into()],
            rows: vec![vec!["a".into(), "1".into()]],
        },
    );
    broker.produce_response(response).await.unwrap();

    let agent = Arc::new(TextOnlyAgent::default());
    run_relay(Arc::clone(&broker), Arc::clone(&agent), 150).await;

    assert_eq!(agent.delivered(), ["k | v\na | 1"]);
}

#[tokio::test]
async fn test_relay_survives_idle_queue() {
    let broker = broker();
    broker.initialize().await.unwrap();

    let agent = Arc::new(TextOnlyAgent::default());
    run_relay(Arc::clone(&broker), Arc::clone(&agent), 120).await;

    assert!(agent.delivered().is_empty());
}
