//! Key-value store trait
//!
//! The only shared mutable resource of the orchestrator. Writes are atomic
//! per key; there are no cross-key transactions.

use crate::error::StoreError;
use crate::path;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;

/// A stored entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    /// Full key
    pub key: String,
    /// Raw value
    pub value: Vec<u8>,
}

/// Hierarchical key-value store
#[async_trait]
pub trait KvStore: Send + Sync + std::fmt::Debug {
    /// Read a key
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Write a key
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// List every entry under `prefix`, sorted by key
    async fn list(&self, prefix: &str) -> Result<Vec<KvPair>, StoreError>;

    /// Delete every entry under `prefix`
    async fn delete_tree(&self, prefix: &str) -> Result<(), StoreError>;
}

/// Typed helpers available on every [`KvStore`]
#[async_trait]
pub trait KvStoreExt: KvStore {
    /// Read a key as UTF-8 text
    async fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .get(key)
            .await?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Write UTF-8 text
    async fn set_string(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.set(key, value.as_bytes().to_vec()).await
    }

    /// Read and decode a JSON value
    async fn get_json<T>(&self, key: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::decode(key, e)),
            None => Ok(None),
        }
    }

    /// Encode and write a JSON value
    async fn set_json<T>(&self, key: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let bytes = serde_json::to_vec(value).map_err(|e| StoreError::encode(key, e))?;
        self.set(key, bytes).await
    }

    /// Distinct direct children of `prefix`, sorted
    async fn child_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let entries = self.list(prefix).await?;
        let children: BTreeSet<String> = entries
            .iter()
            .filter_map(|pair| path::child_segment(&pair.key, prefix))
            .map(str::to_string)
            .collect();
        Ok(children.into_iter().collect())
    }

    /// Check whether a key holds a value
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key).await?.is_some())
    }
}

impl<S: KvStore + ?Sized> KvStoreExt for S {}
