//! ORC Store - Hierarchical key-value store
//!
//! The store is the only shared mutable resource of the orchestrator:
//! - [`KvStore`]: `get`, `set`, `list`, `delete_tree`, atomic per key
//! - [`MemoryStore`]: radix trie backend with prefix listing
//! - [`StoreContext`]: write buffering with a flush barrier
//! - [`KeyedLocks`]: in-process serialization of read-modify-write cycles

#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod locks;
pub mod memory;
pub mod path;
pub mod store;

// Re-exports
pub use context::StoreContext;
pub use error::StoreError;
pub use locks::KeyedLocks;
pub use memory::MemoryStore;
pub use store::{KvPair, KvStore, KvStoreExt};

/// Prelude for common imports
pub mod prelude {
    pub use crate::context::StoreContext;
    pub use crate::error::StoreError;
    pub use crate::memory::MemoryStore;
    pub use crate::store::{KvStore, KvStoreExt};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
