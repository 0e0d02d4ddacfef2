//! Store behaviour shared by the pipeline phases

use orc_store::prelude::*;
use orc_store::{path, KeyedLocks};
use orc_tasks::TaskGroup;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn shared_store() -> Arc<dyn KvStore> {
    Arc::new(MemoryStore::new())
}

/// Listing a deployment never leaks keys of a deployment whose id shares a prefix.
#[tokio::test]
async fn deployments_with_common_prefix_are_isolated() {
    let store = shared_store();
    store.set_string("_orc/deployments/d1/status", "INITIAL").await.unwrap();
    store.set_string("_orc/deployments/d10/status", "DEPLOYED").await.unwrap();

    let entries = store.list("_orc/deployments/d1").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].key, "_orc/deployments/d1/status");

    let ids = store.child_keys("_orc/deployments").await.unwrap();
    assert_eq!(ids, vec!["d1", "d10"]);
}

/// A flushed context makes every write visible, a failed phase stops the rest.
#[tokio::test]
async fn context_shares_cancellation_with_phase_tasks() {
    let store = shared_store();
    let phase: TaskGroup<(), String> = TaskGroup::new(4);
    let ctx = StoreContext::with_signal(Arc::clone(&store), 4, phase.cancel_signal());

    ctx.set_string("before", "1");
    tokio::task::yield_now().await;
    phase.spawn(async { Err("node failed".to_string()) });
    assert!(phase.wait().await.is_err());

    ctx.set_string("after", "2");
    let flushed = ctx.flush().await;

    assert!(matches!(flushed, Err(StoreError::Cancelled)));
    assert!(store.get("after").await.unwrap().is_none());
}

/// Concurrent read-modify-write under a keyed lock loses no update.
#[tokio::test]
async fn keyed_lock_serializes_read_modify_write() {
    let store = shared_store();
    let locks = KeyedLocks::new();
    let key = path::join(["_orc", "deployments", "d", "counter"]);
    store.set_json(&key, &0u32).await.unwrap();

    let group: TaskGroup<(), StoreError> = TaskGroup::new(8);
    for _ in 0..16 {
        let store = Arc::clone(&store);
        let locks = locks.clone();
        let key = key.clone();
        group.spawn(async move {
            let _guard = locks.lock(&key).await;
            let current: u32 = store.get_json(&key).await?.unwrap_or_default();
            tokio::task::yield_now().await;
            store.set_json(&key, &(current + 1)).await
        });
    }
    group.wait().await.unwrap();

    let total: Option<u32> = store.get_json(&key).await.unwrap();
    assert_eq!(total, Some(16));
}
