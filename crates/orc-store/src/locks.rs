//! Per-key async locks
//!
//! The store has no transactions. Read-modify-write cycles performed by
//! concurrent tasks of the same process on one key are serialized with
//! [`KeyedLocks`]. Other processes are not covered.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily created async mutex per key
#[derive(Debug, Default, Clone)]
pub struct KeyedLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    /// Create empty lock table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = Arc::clone(
            self.locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        mutex.lock_owned().await
    }

    /// Number of keys ever locked
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Check if no key was ever locked
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
