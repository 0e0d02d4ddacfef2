//! Write-buffering context
//!
//! [`StoreContext`] issues store writes as tasks of a [`TaskGroup`]. Writes
//! run concurrently and are not ordered with respect to each other; `flush`
//! is the barrier that waits for all of them and reports the first failure.
//! A context can be shared by the tasks of a phase and flushed repeatedly.
//!
//! When the context shares its [`CancelSignal`] with a phase, a failing phase
//! task stops writes that have not started yet. Writes already issued are
//! never rolled back.

use crate::error::StoreError;
use crate::store::KvStore;
use orc_tasks::{CancelSignal, TaskGroup, DEFAULT_LIMIT};
use serde::Serialize;
use std::sync::Arc;

/// Buffered writer over a [`KvStore`]
#[derive(Debug)]
pub struct StoreContext {
    store: Arc<dyn KvStore>,
    writes: TaskGroup<(), StoreError>,
}

impl StoreContext {
    /// Create a context with its own cancellation signal
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_signal(store, DEFAULT_LIMIT, CancelSignal::new())
    }

    /// Create a context bound to a phase's cancellation signal
    #[must_use]
    pub fn with_signal(store: Arc<dyn KvStore>, limit: usize, signal: CancelSignal) -> Self {
        Self {
            store,
            writes: TaskGroup::with_signal(limit, signal),
        }
    }

    /// Signal shared by the buffered writes
    #[inline]
    #[must_use]
    pub fn cancel_signal(&self) -> CancelSignal {
        self.writes.cancel_signal()
    }

    /// Underlying store, for reads
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Number of writes not yet flushed
    #[inline]
    #[must_use]
    pub fn pending(&self) -> usize {
        self.writes.len()
    }

    /// Queue a raw write
    pub fn set(&self, key: impl Into<String>, value: Vec<u8>) {
        let store = Arc::clone(&self.store);
        let key = key.into();
        self.writes
            .spawn(async move { store.set(&key, value).await });
    }

    /// Queue a text write
    pub fn set_string(&self, key: impl Into<String>, value: impl Into<String>) {
        self.set(key, value.into().into_bytes());
    }

    /// Encode now and queue a JSON write
    ///
    /// # Errors
    /// Returns [`StoreError::Encode`] if the value cannot be serialized.
    pub fn set_json<T>(&self, key: impl Into<String>, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + ?Sized,
    {
        let key = key.into();
        let bytes = serde_json::to_vec(value).map_err(|e| StoreError::encode(key.as_str(), e))?;
        self.set(key, bytes);
        Ok(())
    }

    /// Queue a subtree deletion
    pub fn delete_tree(&self, prefix: impl Into<String>) {
        let store = Arc::clone(&self.store);
        let prefix = prefix.into();
        self.writes
            .spawn(async move { store.delete_tree(&prefix).await });
    }

    /// Wait for every queued write
    ///
    /// # Errors
    /// Returns the first write error; [`StoreError::Cancelled`] if the shared
    /// signal was cancelled before some writes could run.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let queued = self.writes.len();
        self.writes.wait().await?;
        if self.writes.cancel_signal().is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        tracing::trace!(writes = queued, "store context flushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::store::KvStoreExt;

    #[tokio::test]
    async fn flush_waits_for_all_writes() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let ctx = StoreContext::new(Arc::clone(&store));
        for i in 0..20 {
            ctx.set_string(format!("k/{i}"), i.to_string());
        }
        ctx.set_json("k/json", &serde_json::json!({"a": 1})).unwrap();
        assert_eq!(ctx.pending(), 21);

        ctx.flush().await.unwrap();
        assert_eq!(store.list("k").await.unwrap().len(), 21);
        assert_eq!(store.get_string("k/7").await.unwrap().as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn cancelled_context_skips_writes() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let signal = CancelSignal::new();
        let ctx = StoreContext::with_signal(Arc::clone(&store), 4, signal.clone());

        signal.cancel();
        ctx.set_string("late", "x");

        assert!(matches!(ctx.flush().await, Err(StoreError::Cancelled)));
        assert!(store.get("late").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_tree_is_buffered() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        store.set_string("n/1/state", "initial").await.unwrap();

        let ctx = StoreContext::new(Arc::clone(&store));
        ctx.delete_tree("n/1");
        ctx.flush().await.unwrap();

        assert!(store.list("n").await.unwrap().is_empty());
    }
}
