//! Deployments facade
//!
//! [`Deployments`] owns the collaborators shared by every operation on a
//! deployment: the store, the event sink, the type resolver and the
//! pluggable topology provider and workflow enhancer. It is cheap to clone;
//! clones share the type cache and the keyed locks.

use crate::config::DeploymentsConfig;
use crate::topology::{TopologyProvider, YamlTopologyProvider};
use crate::types::TypeResolver;
use crate::workflows::{StepValidator, WorkflowEnhancer};
use orc_events::{EventSink, FieldType, LogEntry, LogLevel};
use orc_store::{KeyedLocks, KvStore};
use std::sync::Arc;

/// Entry point of every deployment operation
#[derive(Debug, Clone)]
pub struct Deployments {
    store: Arc<dyn KvStore>,
    events: Arc<dyn EventSink>,
    config: DeploymentsConfig,
    types: TypeResolver,
    locks: KeyedLocks,
    topology_provider: Arc<dyn TopologyProvider>,
    workflow_enhancer: Arc<dyn WorkflowEnhancer>,
}

impl Deployments {
    /// Create over `store`, reporting to `events`
    ///
    /// Topologies are read as YAML files and workflows are validated with
    /// [`StepValidator`] unless replaced.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, events: Arc<dyn EventSink>, config: DeploymentsConfig) -> Self {
        let types = TypeResolver::new(Arc::clone(&store), &config);
        Self {
            store,
            events,
            config,
            types,
            locks: KeyedLocks::new(),
            topology_provider: Arc::new(YamlTopologyProvider),
            workflow_enhancer: Arc::new(StepValidator),
        }
    }

    /// With topology provider
    #[must_use]
    pub fn with_topology_provider(mut self, provider: Arc<dyn TopologyProvider>) -> Self {
        self.topology_provider = provider;
        self
    }

    /// With workflow enhancer
    #[must_use]
    pub fn with_workflow_enhancer(mut self, enhancer: Arc<dyn WorkflowEnhancer>) -> Self {
        self.workflow_enhancer = enhancer;
        self
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Event sink
    #[inline]
    #[must_use]
    pub fn events(&self) -> &Arc<dyn EventSink> {
        &self.events
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &DeploymentsConfig {
        &self.config
    }

    /// Type resolver
    #[inline]
    #[must_use]
    pub fn types(&self) -> &TypeResolver {
        &self.types
    }

    pub(crate) fn locks(&self) -> &KeyedLocks {
        &self.locks
    }

    pub(crate) fn topology_provider(&self) -> &Arc<dyn TopologyProvider> {
        &self.topology_provider
    }

    pub(crate) fn workflow_enhancer(&self) -> &Arc<dyn WorkflowEnhancer> {
        &self.workflow_enhancer
    }

    /// Report a condition that is skipped rather than failed
    pub(crate) fn soft_skip(&self, deployment: &str, node: &str, message: &str) {
        tracing::warn!(deployment, node, "{message}");
        self.events.log(
            LogEntry::new(LogLevel::Warn, deployment, format!("[WARNING] {message}"))
                .with_field(FieldType::NodeId, node),
        );
    }
}
