//! Per-conversation mutual exclusion.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex as SyncMutex, PoisonError},
};

use tokio::sync::Mutex;

pub const DEFAULT_MAX_ENTRIES: usize = 1024;

/// Bounded table of conversation locks.
///
/// Each conversation key gets its own `Mutex`, created lazily on first use,
/// so distinct conversations never contend while messages of one
/// conversation serialize in lock-acquisition order. When the table exceeds
/// its ceiling, entries whose lock is not currently held are evicted; a held
/// lock (outstanding `Arc` clone) is never dropped.
pub struct ConversationLocks {
    max_entries: usize,
    table: SyncMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConversationLocks {
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            table: SyncMutex::new(HashMap::new()),
        }
    }

    /// Get (creating if absent) the lock for `key`. The caller holds the
    /// returned handle for as long as it needs exclusion:
    ///
    /// ```ignore
    /// let lock = locks.acquire(&key);
    /// let _guard = lock.lock().await;
    /// ```
    #[must_use]
    pub fn acquire(&self, key: &str) -> Arc<Mutex<()>> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = table.get(key) {
            return Arc::clone(lock);
        }
        if table.len() >= self.max_entries {
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        let lock = Arc::new(Mutex::new(()));
        table.insert(key.to_string(), Arc::clone(&lock));
        lock
    }

    /// Number of live entries, for diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ConversationLocks {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}
