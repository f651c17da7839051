//! Cooperative worker pool.
//!
//! `NotStarted → Started → Draining → Stopped`. N logical tasks each loop
//! over one unit of work until the shared cancellation token fires (SIGINT,
//! SIGTERM, or a fatal unit-of-work error). Cancellation is cooperative: an
//! in-flight unit always completes; each task observes the token at its next
//! loop check.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    tokio::task::JoinSet,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info},
};

use parlor_common::Result;

/// One long-running consume/process/produce component driven by the pool.
#[async_trait]
pub trait Runnable: Send + Sync {
    /// Runs once before any worker task spawns.
    async fn startup(&self) -> Result<()>;

    /// One unit of work. Recoverable conditions (empty queue, policy
    /// failures) are handled inside and never returned; an `Err` is fatal
    /// and drains the pool.
    async fn run_once(&self, ctx: &WorkerContext) -> Result<()>;

    /// Runs exactly once after every worker task has exited. Skipped when
    /// `startup` never completed.
    async fn shutdown(&self) -> Result<()>;
}

/// Per-task handle passed into every unit of work.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    /// Serial number of this worker task, for logs.
    pub number: usize,
    cancel: CancellationToken,
}

impl WorkerContext {
    #[must_use]
    pub fn should_exit(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Ask the whole pool to drain.
    pub fn request_exit(&self) {
        self.cancel.cancel();
    }

    /// Bounded backoff sleep that wakes early when the pool starts draining.
    pub async fn idle(&self, duration: Duration) {
        tokio::select! {
            () = self.cancel.cancelled() => {}
            () = tokio::time::sleep(duration) => {}
        }
    }
}

/// Harness lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PoolState {
    NotStarted = 0,
    Started = 1,
    Draining = 2,
    Stopped = 3,
}

impl PoolState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Started,
            2 => Self::Draining,
            3 => Self::Stopped,
            _ => Self::NotStarted,
        }
    }
}

/// Drives a [`Runnable`] with N concurrent worker tasks and signal-driven
/// graceful shutdown.
pub struct WorkerPool {
    workers: usize,
    cancel: CancellationToken,
    state: Arc<AtomicU8>,
}

impl WorkerPool {
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            cancel: CancellationToken::new(),
            state: Arc::new(AtomicU8::new(PoolState::NotStarted as u8)),
        }
    }

    /// Token shared by every worker; cancelling it drains the pool. Tests
    /// and embedding code use this instead of sending a real signal.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: PoolState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Run `runnable` until the pool is cancelled, then drain and stop.
    ///
    /// A `startup` error propagates without running `shutdown`; once
    /// `startup` has completed, `shutdown` runs exactly once after the last
    /// worker exits, and its error (if any) is the return value.
    pub async fn run(&self, runnable: Arc<dyn Runnable>) -> Result<()> {
        spawn_signal_listener(self.cancel.clone());

        if self.cancel.is_cancelled() {
            info!("worker pool cancelled before startup");
            return Ok(());
        }

        runnable.startup().await?;
        self.set_state(PoolState::Started);
        info!(workers = self.workers, "worker pool started");

        // Mark the transition to Draining the moment the token fires, even
        // while workers are still finishing their current unit.
        {
            let cancel = self.cancel.clone();
            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                cancel.cancelled().await;
                let _ = state.compare_exchange(
                    PoolState::Started as u8,
                    PoolState::Draining as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
            });
        }

        let mut tasks = JoinSet::new();
        for number in 0..self.workers {
            let runnable = Arc::clone(&runnable);
            let ctx = WorkerContext {
                number,
                cancel: self.cancel.clone(),
            };
            tasks.spawn(worker_loop(runnable, ctx));
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(error) = joined {
                error!(%error, "worker task aborted abnormally");
                self.cancel.cancel();
            }
        }

        let result = runnable.shutdown().await;
        self.set_state(PoolState::Stopped);
        info!("worker pool stopped");
        result
    }
}

async fn worker_loop(runnable: Arc<dyn Runnable>, ctx: WorkerContext) {
    debug!(worker = ctx.number, "worker task started");
    while !ctx.should_exit() {
        if let Err(error) = runnable.run_once(&ctx).await {
            error!(worker = ctx.number, %error, "fatal error in unit of work; draining pool");
            ctx.request_exit();
        }
    }
    debug!(worker = ctx.number, "worker task exited");
}

/// Cancel the token on SIGINT or SIGTERM. The listener itself exits once
/// the token fires, whatever the cause.
fn spawn_signal_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut terminate =
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(stream) => stream,
                    Err(error) => {
                        error!(%error, "failed to install SIGTERM handler");
                        return;
                    }
                };
            tokio::select! {
                () = cancel.cancelled() => return,
                result = tokio::signal::ctrl_c() => match result {
                    Ok(()) => info!("SIGINT received; draining"),
                    Err(error) => error!(%error, "SIGINT handler failed"),
                },
                _ = terminate.recv() => info!("SIGTERM received; draining"),
            }
        }
        #[cfg(not(unix))]
        {
            tokio::select! {
                () = cancel.cancelled() => return,
                result = tokio::signal::ctrl_c() => match result {
                    Ok(()) => info!("interrupt received; draining"),
                    Err(error) => error!(%error, "interrupt handler failed"),
                },
            }
        }
        cancel.cancel();
    });
}
