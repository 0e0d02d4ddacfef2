//! Error types for deployments
//!
//! Provides error handling for:
//! - Malformed topology content (validation)
//! - Missing types, nodes, hosts and list indices (not found)
//! - Store failures, surfaced and never retried here
//!
//! Soft skips (no type implements an operation, unknown entity keyword) are
//! not errors: they are logged at warning level and processing continues.

use orc_store::StoreError;
use orc_tosca::ToscaError;
use std::path::PathBuf;

/// Main deployments error type
#[derive(Debug, thiserror::Error)]
pub enum DeploymentError {
    /// Malformed input
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Referenced entity does not exist
    #[error("not found: {0}")]
    NotFound(#[from] NotFoundError),

    /// Store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Topology document could not be parsed
    #[error("failed to parse topology {}: {source}", .path.display())]
    Topology {
        /// Document path
        path: PathBuf,
        /// Parser error
        #[source]
        source: ToscaError,
    },

    /// Topology document could not be read
    #[error("failed to read topology {}: {source}", .path.display())]
    Io {
        /// Document path
        path: PathBuf,
        /// I/O error
        #[source]
        source: std::io::Error,
    },

    /// Phase stopped because a sibling task failed
    #[error("operation cancelled")]
    Cancelled,
}

impl DeploymentError {
    /// Check if the error is transient
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_transient())
    }

    /// Check if the error reports a missing entity
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Malformed topology content or call arguments
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Function called with the wrong number of operands
    #[error("invalid {operator} function {function}: expected {expected} operands, got {actual}")]
    MalformedFunction {
        /// Operator name
        operator: String,
        /// Rendered call
        function: String,
        /// Expected operand count
        expected: usize,
        /// Actual operand count
        actual: usize,
    },

    /// Path segment addressing a list is not a non-negative integer
    #[error("{segment:?} is not a valid array index")]
    InvalidIndex {
        /// Offending segment
        segment: String,
    },

    /// Capability attribute mapping without attribute name
    #[error("attribute name is missing in path for capability {capability:?} of node {node:?}")]
    MissingPathSegment {
        /// Node name
        node: String,
        /// Capability name
        capability: String,
    },

    /// Stored or declared instance count is not a number
    #[error("invalid instance count {value:?} for node {node:?}")]
    InvalidInstanceCount {
        /// Node name
        node: String,
        /// Offending value
        value: String,
    },

    /// Workflow step references something that does not exist
    #[error("invalid step {step:?} in workflow {workflow:?}: {reason}")]
    InvalidWorkflow {
        /// Workflow name
        workflow: String,
        /// Step name
        step: String,
        /// What is wrong
        reason: String,
    },
}

/// Referenced entity does not exist
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotFoundError {
    /// Type missing from the deployment catalog
    #[error("type {name:?} not found in deployment {deployment:?}")]
    Type {
        /// Deployment id
        deployment: String,
        /// Type name
        name: String,
    },

    /// Node missing from the topology
    #[error("node {name:?} not found in deployment {deployment:?}")]
    Node {
        /// Deployment id
        deployment: String,
        /// Node name
        name: String,
    },

    /// Requirement without target node
    #[error("no target node for requirement #{requirement} of node {node:?}")]
    RequirementTarget {
        /// Node name
        node: String,
        /// Requirement index
        requirement: usize,
    },

    /// Node has no hosting relation
    #[error("failed to resolve the host of node {node:?}")]
    HostedOn {
        /// Node name
        node: String,
    },

    /// Capability not declared by the node type
    #[error("capability {capability:?} not found on node {node:?}")]
    Capability {
        /// Node name
        node: String,
        /// Capability name
        capability: String,
    },

    /// Attribute not declared by the type
    #[error("attribute {attribute:?} not found on type {type_name:?}")]
    Attribute {
        /// Type name
        type_name: String,
        /// Attribute name
        attribute: String,
    },

    /// List index beyond the end of a list
    #[error("index {index} not found (list length {len})")]
    Index {
        /// Requested index
        index: usize,
        /// List length
        len: usize,
    },
}

/// Result type for deployments
pub type Result<T> = std::result::Result<T, DeploymentError>;
