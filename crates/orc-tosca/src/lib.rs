//! ORC TOSCA - Topology data model
//!
//! Types shared by every component of the orchestrator:
//! - [`Value`] and [`SchemaKind`]: dynamically shaped attribute values
//! - [`ValueAssignment`] and [`Function`]: literals and intrinsic functions
//! - [`TypeDef`]: node, relationship, capability, data and artifact types
//! - [`NodeTemplate`], [`Workflow`], [`Topology`]: the deployable document
//! - [`normative`]: built-in type catalog and well-known names

#![warn(missing_docs)]

pub mod error;
pub mod function;
pub mod named;
pub mod normative;
pub mod template;
pub mod topology;
pub mod types;
pub mod value;
pub mod workflow;

// Re-exports
pub use error::ToscaError;
pub use function::{Function, Operand, ValueAssignment};
pub use named::Named;
pub use template::{CapabilityAssignment, NodeTemplate, RequirementAssignment};
pub use topology::{Topology, TopologyTemplate};
pub use types::{
    AttributeDefinition, CapabilityDefinition, InterfaceDefinition, OperationDefinition,
    PropertyDefinition, RequirementDefinition, TypeDef, TypeKind,
};
pub use value::{SchemaKind, Value};
pub use workflow::{Activity, Step, Workflow};

/// Prelude for common imports
pub mod prelude {
    pub use crate::function::{Function, ValueAssignment};
    pub use crate::template::{NodeTemplate, RequirementAssignment};
    pub use crate::topology::Topology;
    pub use crate::types::{AttributeDefinition, TypeDef, TypeKind};
    pub use crate::value::{SchemaKind, Value};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
