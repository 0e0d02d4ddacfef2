//! Testing utilities for ORC workspace
//!
//! Shared fixtures: topology builders, recording sinks, failing stores.

#![allow(missing_docs)]

use async_trait::async_trait;
use orc_events::{EventSink, LogEntry, LogLevel};
use orc_store::{path, KvPair, KvStore, MemoryStore, StoreError};
use orc_tosca::normative::{ATTACHMENT_CAPABILITY, BLOCK_STORAGE, COMPUTE, DEFAULT_INSTANCES, LOCAL_STORAGE, SCALABLE};
use orc_tosca::{CapabilityAssignment, Named, NodeTemplate, RequirementAssignment, Topology, ValueAssignment};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

pub fn memory_store() -> Arc<dyn KvStore> {
    Arc::new(MemoryStore::new())
}

/// Fluent [`Topology`] construction
#[derive(Debug, Clone, Default)]
pub struct TopologyBuilder {
    topology: Topology,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, name: &str, template: NodeTemplate) -> Self {
        self.topology
            .topology_template
            .node_templates
            .insert(name.to_string(), template);
        self
    }

    pub fn build(self) -> Topology {
        self.topology
    }
}

/// Node template of `type_name` declaring `count` scalable instances
pub fn scalable(type_name: &str, count: usize) -> NodeTemplate {
    let mut template = NodeTemplate::of_type(type_name);
    let mut scalable = CapabilityAssignment::default();
    scalable
        .properties
        .insert(DEFAULT_INSTANCES.to_string(), ValueAssignment::literal(count.to_string()));
    template.capabilities.insert(SCALABLE.to_string(), scalable);
    template
}

pub fn compute(count: usize) -> NodeTemplate {
    scalable(COMPUTE, count)
}

pub fn require(mut template: NodeTemplate, name: &str, requirement: RequirementAssignment) -> NodeTemplate {
    template.requirements.push(Named::new(name, requirement));
    template
}

/// `DB` compute with 2 instances attaching block storage `Vol`
pub fn db_with_volume() -> Topology {
    TopologyBuilder::new()
        .node(
            "DB",
            require(
                compute(2),
                LOCAL_STORAGE,
                RequirementAssignment::to_node("Vol").with_capability(ATTACHMENT_CAPABILITY),
            ),
        )
        .node("Vol", NodeTemplate::of_type(BLOCK_STORAGE))
        .build()
}

/// Write `yaml` to a temporary topology file
pub fn topology_file(yaml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Sink keeping every entry in memory
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingEventSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Contents of the entries logged at `level`
    pub fn contents(&self, level: LogLevel) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.level == level)
            .map(|e| e.content.clone())
            .collect()
    }
}

impl EventSink for RecordingEventSink {
    fn log(&self, entry: LogEntry) {
        self.entries.lock().push(entry);
    }
}

/// In-memory store refusing writes under chosen prefixes
#[derive(Debug)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing: Mutex<Vec<String>>,
}

impl Default for FlakyStore {
    fn default() -> Self {
        Self {
            inner: MemoryStore::new(),
            failing: Mutex::new(Vec::new()),
        }
    }
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_writes_under(&self, prefix: &str) {
        self.failing.lock().push(prefix.to_string());
    }

    fn check(&self, key: &str) -> Result<(), StoreError> {
        if self.failing.lock().iter().any(|p| path::is_under(key, p)) {
            return Err(StoreError::unavailable(format!("write refused for {key}")));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.check(key)?;
        self.inner.set(key, value).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<KvPair>, StoreError> {
        self.inner.list(prefix).await
    }

    async fn delete_tree(&self, prefix: &str) -> Result<(), StoreError> {
        self.check(prefix)?;
        self.inner.delete_tree(prefix).await
    }
}
