//! Bounded in-process broker backend.

use std::{
    sync::{Mutex as SyncMutex, PoisonError},
    time::Duration,
};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    tokio::sync::{Mutex, mpsc},
    tracing::{debug, info},
};

use {
    parlor_common::{Error, Result},
    parlor_messages::{RequestMessage, ResponseMessage},
    parlor_runtime::{Component, LifecycleGate},
};

use crate::broker::MessageBroker;

const REQUEST_QUEUE: &str = "request_queue";
const RESPONSE_QUEUE: &str = "response_queue";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryBrokerConfig {
    /// Capacity of each channel; a produce beyond it fails with `FullQueue`.
    pub capacity: usize,
    /// How long a consume blocks before failing with `EmptyQueue`.
    pub consume_timeout_ms: u64,
    /// Namespacing prefix so multiple deployments can share one backend.
    pub queue_name_prefix: String,
}

impl Default for MemoryBrokerConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            consume_timeout_ms: 1000,
            queue_name_prefix: String::new(),
        }
    }
}

/// One direction of the broker: a bounded sender/receiver pair created on
/// `initialize` and torn down on `finalize`. The receiver sits behind an
/// async mutex so concurrent consumers take turns at the head.
#[derive(Debug)]
struct Queue<T> {
    name: String,
    tx: SyncMutex<Option<mpsc::Sender<T>>>,
    rx: Mutex<Option<mpsc::Receiver<T>>>,
}

impl<T> Queue<T> {
    fn new(name: String) -> Self {
        Self {
            name,
            tx: SyncMutex::new(None),
            rx: Mutex::new(None),
        }
    }

    async fn open(&self, capacity: usize) {
        let (tx, rx) = mpsc::channel(capacity);
        *self.tx.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
        *self.rx.lock().await = Some(rx);
    }

    async fn close(&self) {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        self.rx.lock().await.take();
    }

    fn produce(&self, message: T) -> Result<()> {
        let sender = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| Error::broker(format!("queue `{}` is not initialized", self.name)))?;
        match sender.try_send(message) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(Error::full_queue(&self.name)),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(Error::broker(format!("queue `{}` is closed", self.name)))
            }
        }
    }

    async fn consume(&self, timeout: Duration) -> Result<T> {
        let mut guard = self.rx.lock().await;
        let receiver = guard
            .as_mut()
            .ok_or_else(|| Error::broker(format!("queue `{}` is not initialized", self.name)))?;
        match tokio::time::timeout(timeout, receiver.recv()).await {
            Err(_elapsed) => Err(Error::EmptyQueue),
            Ok(None) => Err(Error::broker(format!("queue `{}` is closed", self.name))),
            Ok(Some(message)) => Ok(message),
        }
    }
}

/// In-memory [`MessageBroker`] backend: two bounded queues with blocking
/// consume and timeout. The default backend for local runs and tests.
#[derive(Debug)]
pub struct MemoryBroker {
    config: MemoryBrokerConfig,
    gate: LifecycleGate,
    requests: Queue<RequestMessage>,
    responses: Queue<ResponseMessage>,
}

impl MemoryBroker {
    #[must_use]
    pub fn new(config: MemoryBrokerConfig) -> Self {
        let requests = Queue::new(queue_name(&config.queue_name_prefix, REQUEST_QUEUE));
        let responses = Queue::new(queue_name(&config.queue_name_prefix, RESPONSE_QUEUE));
        Self {
            config,
            gate: LifecycleGate::new(),
            requests,
            responses,
        }
    }

    fn consume_timeout(&self) -> Duration {
        Duration::from_millis(self.config.consume_timeout_ms)
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new(MemoryBrokerConfig::default())
    }
}

fn queue_name(prefix: &str, base: &str) -> String {
    if prefix.is_empty() {
        format!("parlor_{base}")
    } else {
        format!("{prefix}_parlor_{base}")
    }
}

#[async_trait]
impl Component for MemoryBroker {
    async fn initialize(&self) -> Result<()> {
        if !self.gate.enter_initialize() {
            return Ok(());
        }
        self.requests.open(self.config.capacity).await;
        self.responses.open(self.config.capacity).await;
        info!(
            request_queue = %self.requests.name,
            response_queue = %self.responses.name,
            capacity = self.config.capacity,
            "memory broker initialized"
        );
        Ok(())
    }

    async fn finalize(&self) -> Result<()> {
        if !self.gate.enter_finalize() {
            return Ok(());
        }
        self.requests.close().await;
        self.responses.close().await;
        info!("memory broker finalized");
        Ok(())
    }
}

#[async_trait]
impl MessageBroker for MemoryBroker {
    async fn produce_request(&self, message: RequestMessage) -> Result<()> {
        debug!(uuid = %message.uuid, queue = %self.requests.name, "produced request");
        self.requests.produce(message)
    }

    async fn consume_request(&self) -> Result<RequestMessage> {
        let message = self.requests.consume(self.consume_timeout()).await?;
        debug!(uuid = %message.uuid, queue = %self.requests.name, "consumed request");
        Ok(message)
    }

    async fn produce_response(&self, message: ResponseMessage) -> Result<()> {
        debug!(uuid = %message.uuid, queue = %self.responses.name, "produced response");
        self.responses.produce(message)
    }

    async fn consume_response(&self) -> Result<ResponseMessage> {
        let message = self.responses.consume(self.consume_timeout()).await?;
        debug!(uuid = %message.uuid, queue = %self.responses.name, "consumed response");
        Ok(message)
    }
}
