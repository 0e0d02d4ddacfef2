//! Event sinks
//!
//! Logging an event is fire-and-forget: a sink never reports its own
//! failures to the caller.

use crate::entry::{format_log, LogEntry, LogLevel};
use orc_store::{path, KvStore, StoreError};
use std::sync::Arc;

/// Root of stored deployment logs
pub const LOGS_PREFIX: &str = "_orc/logs";

/// Destination of deployment log entries
pub trait EventSink: Send + Sync + std::fmt::Debug {
    /// Record an entry
    fn log(&self, entry: LogEntry);

    /// Record an entry without optional fields
    fn simple(&self, level: LogLevel, deployment_id: &str, content: &str) {
        self.log(LogEntry::new(level, deployment_id, content));
    }
}

/// Sink writing entries to the store under [`LOGS_PREFIX`]
///
/// Each entry is also mirrored to `tracing` at debug level.
#[derive(Debug, Clone)]
pub struct StoreEventSink {
    store: Arc<dyn KvStore>,
}

impl StoreEventSink {
    /// Create sink over `store`
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Store key of an entry
    #[must_use]
    pub fn entry_key(entry: &LogEntry) -> String {
        path::join([LOGS_PREFIX, entry.deployment_id.as_str(), entry.key_timestamp().as_str()])
    }

    /// Write an entry and wait for the store
    ///
    /// Entries without content or deployment are dropped.
    ///
    /// # Errors
    /// Returns the store error if the write failed.
    pub async fn write(&self, mut entry: LogEntry) -> Result<(), StoreError> {
        if entry.content.is_empty() || entry.deployment_id.is_empty() {
            tracing::warn!(?entry, "dropping log entry without content or deployment");
            return Ok(());
        }
        let original = entry.content.len();
        if entry.truncate_content() {
            tracing::warn!(
                from = original,
                to = entry.content.len(),
                "log content exceeds max size, truncated"
            );
        }

        let flat = entry.to_flat_map();
        tracing::debug!("{}", format_log(&flat));

        let bytes = serde_json::to_vec(&flat).map_err(|e| StoreError::encode(Self::entry_key(&entry), e))?;
        self.store.set(&Self::entry_key(&entry), bytes).await
    }
}

impl EventSink for StoreEventSink {
    fn log(&self, entry: LogEntry) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(content = %entry.content, "no runtime, log entry not stored");
            return;
        };
        let sink = self.clone();
        handle.spawn(async move {
            if let Err(err) = sink.write(entry).await {
                tracing::warn!(error = %err, "failed to store log entry");
            }
        });
    }
}

/// Sink mirroring entries to `tracing` only
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn log(&self, entry: LogEntry) {
        let rendered = format_log(&entry.to_flat_map());
        match entry.level {
            LogLevel::Error => tracing::error!("{rendered}"),
            LogLevel::Warn => tracing::warn!("{rendered}"),
            LogLevel::Info => tracing::info!("{rendered}"),
            LogLevel::Debug => tracing::debug!("{rendered}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::CONTENT_MAX_SIZE;
    use orc_store::{KvStoreExt, MemoryStore};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn sink() -> (Arc<dyn KvStore>, StoreEventSink) {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        (Arc::clone(&store), StoreEventSink::new(store))
    }

    #[tokio::test]
    async fn write_stores_flat_json() {
        let (store, sink) = sink();
        let entry = LogEntry::new(LogLevel::Info, "d1", "hello");
        let key = StoreEventSink::entry_key(&entry);
        sink.write(entry).await.unwrap();

        let flat: BTreeMap<String, String> = store.get_json(&key).await.unwrap().unwrap();
        assert_eq!(flat["content"], "hello");
        assert_eq!(flat["level"], "INFO");
        assert!(key.starts_with("_orc/logs/d1/"));
    }

    #[tokio::test]
    async fn write_truncates_large_content() {
        let (store, sink) = sink();
        let entry = LogEntry::new(LogLevel::Debug, "d1", "x".repeat(CONTENT_MAX_SIZE + 10));
        let key = StoreEventSink::entry_key(&entry);
        sink.write(entry).await.unwrap();

        let flat: BTreeMap<String, String> = store.get_json(&key).await.unwrap().unwrap();
        assert_eq!(flat["content"].len(), CONTENT_MAX_SIZE);
    }

    #[tokio::test]
    async fn empty_content_is_dropped() {
        let (store, sink) = sink();
        sink.write(LogEntry::new(LogLevel::Info, "d1", "")).await.unwrap();
        assert!(store.list(LOGS_PREFIX).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn log_is_fire_and_forget() {
        let (store, sink) = sink();
        sink.simple(LogLevel::Warn, "d2", "soft skip");

        for _ in 0..50 {
            if !store.list("_orc/logs/d2").await.unwrap().is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("log entry was never stored");
    }
}
