//! In-memory store backed by a radix trie
//!
//! Provides [`MemoryStore`] with prefix listing via `radix_trie`.

use crate::error::StoreError;
use crate::path;
use crate::store::{KvPair, KvStore};
use async_trait::async_trait;
use parking_lot::RwLock;
use radix_trie::{Trie, TrieCommon};
use std::collections::BTreeMap;

/// Thread-safe in-memory key-value store
///
/// We use radix_trie for efficient:
/// - Prefix listing of a deployment subtree
/// - Subtree deletion when pruning instances
#[derive(Debug, Default)]
pub struct MemoryStore {
    trie: RwLock<Trie<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.trie.read().len()
    }

    /// Check if store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trie.read().is_empty()
    }

    /// Copy every entry out as text, sorted by key
    #[must_use]
    pub fn export(&self) -> BTreeMap<String, String> {
        self.trie
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), String::from_utf8_lossy(v).into_owned()))
            .collect()
    }

    /// Load entries, overwriting existing keys
    pub fn import<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut trie = self.trie.write();
        for (key, value) in entries {
            trie.insert(key, value.into_bytes());
        }
    }

    fn matching(&self, prefix: &str) -> Vec<KvPair> {
        let prefix = prefix.trim_end_matches('/');
        let trie = self.trie.read();

        let mut pairs: Vec<KvPair> = if prefix.is_empty() {
            trie.iter()
                .map(|(k, v)| KvPair {
                    key: k.clone(),
                    value: v.clone(),
                })
                .collect()
        } else {
            match trie.get_raw_descendant(&prefix.to_string()) {
                Some(subtrie) => subtrie
                    .iter()
                    .filter(|(k, _)| path::is_under(k, prefix))
                    .map(|(k, v)| KvPair {
                        key: k.clone(),
                        value: v.clone(),
                    })
                    .collect(),
                None => Vec::new(),
            }
        };

        pairs.sort_by(|a, b| a.key.cmp(&b.key));
        pairs
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.trie.read().get(&key.to_string()).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.trie.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<KvPair>, StoreError> {
        Ok(self.matching(prefix))
    }

    async fn delete_tree(&self, prefix: &str) -> Result<(), StoreError> {
        let keys: Vec<String> = self.matching(prefix).into_iter().map(|p| p.key).collect();
        let mut trie = self.trie.write();
        for key in &keys {
            trie.remove(key);
        }
        tracing::trace!(prefix, removed = keys.len(), "deleted subtree");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::KvStoreExt;
    use pretty_assertions::assert_eq;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for key in ["d/nodes/A", "d/nodes/A/nbInstances", "d/nodes/AB", "d/nodes/B", "e/x"] {
            store.set_string(key, key).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn get_and_set() {
        let store = MemoryStore::new();
        assert!(store.get("missing").await.unwrap().is_none());

        store.set("k", b"v".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn list_respects_segment_boundaries() {
        let store = seeded().await;

        let keys: Vec<String> = store
            .list("d/nodes/A")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.key)
            .collect();
        assert_eq!(keys, vec!["d/nodes/A", "d/nodes/A/nbInstances"]);
    }

    #[tokio::test]
    async fn list_unknown_prefix_is_empty() {
        let store = seeded().await;
        assert!(store.list("zzz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn child_keys_are_distinct_and_sorted() {
        let store = seeded().await;
        let children = store.child_keys("d/nodes").await.unwrap();
        assert_eq!(children, vec!["A", "AB", "B"]);
    }

    #[tokio::test]
    async fn delete_tree_keeps_siblings() {
        let store = seeded().await;
        store.delete_tree("d/nodes/A").await.unwrap();

        assert!(store.get("d/nodes/A").await.unwrap().is_none());
        assert!(store.get("d/nodes/A/nbInstances").await.unwrap().is_none());
        assert!(store.get("d/nodes/AB").await.unwrap().is_some());
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn json_round_trip_and_decode_error() {
        let store = MemoryStore::new();
        store.set_json("n", &vec![1, 2, 3]).await.unwrap();
        let back: Option<Vec<u32>> = store.get_json("n").await.unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));

        store.set_string("bad", "{").await.unwrap();
        let err = store.get_json::<Vec<u32>>("bad").await.unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[test]
    fn export_import() {
        let store = MemoryStore::new();
        store.import([("a/b".to_string(), "1".to_string())]);
        let exported = store.export();
        assert_eq!(exported.get("a/b").map(String::as_str), Some("1"));
    }
}
