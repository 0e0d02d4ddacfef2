//! Store snapshots
//!
//! The in-memory store is loaded from and saved to a JSON object of
//! key to value, so that consecutive invocations share state.

use anyhow::{Context, Result};
use orc_store::MemoryStore;
use std::collections::BTreeMap;
use std::path::Path;

/// Store holding the snapshot at `path`, empty if the file does not exist
pub fn load(path: Option<&Path>) -> Result<MemoryStore> {
    let store = MemoryStore::new();
    let Some(path) = path.filter(|p| p.exists()) else {
        return Ok(store);
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read state {}", path.display()))?;
    let entries: BTreeMap<String, String> =
        serde_json::from_str(&text).with_context(|| format!("invalid state {}", path.display()))?;
    tracing::debug!(path = %path.display(), entries = entries.len(), "state loaded");
    store.import(entries);
    Ok(store)
}

/// Write every entry of `store` to `path`
pub fn save(store: &MemoryStore, path: &Path) -> Result<()> {
    let entries = store.export();
    let text = serde_json::to_string_pretty(&entries)?;
    std::fs::write(path, text).with_context(|| format!("failed to write state {}", path.display()))?;
    tracing::debug!(path = %path.display(), entries = entries.len(), "state saved");
    Ok(())
}
