//! Stateful components with idempotent setup and teardown.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use parlor_common::Result;

/// A component with explicit setup/teardown. Brokers, policies, and channel
/// agents all implement this; components with nothing to do write trivial
/// bodies rather than inheriting no-ops, so the contract stays visible at
/// the call site.
///
/// Implementations guard both methods with a [`LifecycleGate`] so that
/// repeated calls are no-ops: exactly one non-trivial initialize and one
/// non-trivial finalize happen per initialized period.
#[async_trait]
pub trait Component: Send + Sync {
    /// Acquire resources (connections, queue topology, model handles).
    async fn initialize(&self) -> Result<()>;

    /// Release whatever `initialize` acquired. No-op when not initialized.
    async fn finalize(&self) -> Result<()>;
}

/// Boolean gate enforcing lifecycle idempotency.
///
/// `enter_initialize` yields `true` exactly once per
/// not-initialized→initialized transition; `enter_finalize` the converse.
/// The flag flips before the hook body runs, so a hook never runs twice
/// without an intervening state transition even under concurrent callers.
#[derive(Debug, Default)]
pub struct LifecycleGate {
    initialized: AtomicBool,
}

impl LifecycleGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if the caller should run its initialize body.
    #[must_use]
    pub fn enter_initialize(&self) -> bool {
        self.initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// `true` if the caller should run its finalize body.
    #[must_use]
    pub fn enter_finalize(&self) -> bool {
        self.initialized
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }
}
