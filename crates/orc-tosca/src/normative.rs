//! Normative type names and the built-in type catalog

use crate::error::ToscaError;
use crate::topology::Topology;
use crate::types::TypeDef;

/// Root of every node type
pub const NODE_ROOT: &str = "tosca.nodes.Root";
/// Compute node type
pub const COMPUTE: &str = "tosca.nodes.Compute";
/// Block storage node type
pub const BLOCK_STORAGE: &str = "tosca.nodes.BlockStorage";
/// Hosting relationship
pub const HOSTED_ON: &str = "tosca.relationships.HostedOn";
/// Attachment relationship
pub const ATTACHES_TO: &str = "tosca.relationships.AttachesTo";
/// Parent of implementation artifact types
pub const IMPLEMENTATION_ARTIFACT: &str = "tosca.artifacts.Implementation";
/// Floating IP connectivity capability
pub const FIP_CONNECTIVITY: &str = "yorc.capabilities.openstack.FIPConnectivity";
/// Assignable capability
pub const ASSIGNABLE: &str = "yorc.capabilities.Assignable";
/// Attachment capability
pub const ATTACHMENT_CAPABILITY: &str = "tosca.capabilities.Attachment";

/// Capability carrying the instance count
pub const SCALABLE: &str = "scalable";
/// Property of [`SCALABLE`] holding the declared count
pub const DEFAULT_INSTANCES: &str = "default_instances";

/// Requirement of a compute node on its block storages
pub const LOCAL_STORAGE: &str = "local_storage";
/// Requirement of a block storage on its compute node
pub const ATTACHMENT: &str = "attachment";
/// Requirement on a floating IP
pub const NETWORK: &str = "network";
/// Requirement on an assignable resource
pub const ASSIGNMENT: &str = "assignment";
/// Block storage property forwarded to the attachment
pub const DEVICE: &str = "device";

const NORMATIVE_TYPES: &str = include_str!("normative_types.yaml");

/// Built-in types persisted before the topology's own types
///
/// # Errors
/// Returns [`ToscaError::Parse`] if the embedded catalog is malformed.
pub fn builtin_types() -> Result<Vec<(String, TypeDef)>, ToscaError> {
    Ok(Topology::from_yaml_str(NORMATIVE_TYPES)?.types())
}
