//! ORC Deployments - Topology enhancement and attribute mappings
//!
//! Turns a stored topology into node and relationship instances:
//! - [`TypeResolver`]: derivation chains, implementing types, nested schemas
//! - [`Deployments::enhance_nodes`]: the multi-phase enhancement pipeline
//! - [`Deployments::resolve_attribute_mapping`]: nested attribute writes
//! - [`Deployments::store_deployment_definition`]: load, persist, enhance
//!
//! # Example
//!
//! ```rust,no_run
//! use orc_deployments::prelude::*;
//! use orc_events::TracingEventSink;
//! use orc_store::MemoryStore;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn run() -> orc_deployments::Result<()> {
//! let deployments = Deployments::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(TracingEventSink),
//!     DeploymentsConfig::default(),
//! );
//! deployments
//!     .store_deployment_definition("app", Path::new("topology.yaml"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod attribute_mappings;
pub mod attribute_notifications;
pub mod config;
pub mod definition_store;
pub mod deployments;
pub mod enhancer;
pub mod error;
pub mod instances;
pub mod keys;
pub mod nodes;
pub mod operation_outputs;
pub mod relationships;
pub mod status;
pub mod topology;
pub mod types;
pub mod workflows;

// Re-exports
pub use attribute_mappings::{build_value, update_value};
pub use attribute_notifications::AttributeSubscriber;
pub use config::DeploymentsConfig;
pub use deployments::Deployments;
pub use error::{DeploymentError, NotFoundError, Result, ValidationError};
pub use instances::NodeState;
pub use relationships::{RelationshipInstance, RelationshipInstanceRecord};
pub use status::DeploymentStatus;
pub use topology::{TopologyProvider, YamlTopologyProvider};
pub use types::{NestedTypeLookup, TypeResolver};
pub use workflows::{StepValidator, WorkflowEnhancer};

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::DeploymentsConfig;
    pub use crate::deployments::Deployments;
    pub use crate::error::{DeploymentError, Result};
    pub use crate::instances::NodeState;
    pub use crate::status::DeploymentStatus;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
