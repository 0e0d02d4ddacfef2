//! Store key layout of a deployment
//!
//! ```text
//! _orc/deployments/<id>/status
//! _orc/deployments/<id>/topology/types/<type>
//! _orc/deployments/<id>/topology/nodes/<node>[/nbInstances]
//! _orc/deployments/<id>/topology/workflows/<workflow>[/steps/<step>]
//! _orc/deployments/<id>/topology/implementation_artifacts_extensions
//! _orc/deployments/<id>/topology/instances/<node>/<idx>/attributes/<attr>
//! _orc/deployments/<id>/topology/instances/<node>/<idx>/capabilities/<cap>/attributes/<attr>
//! _orc/deployments/<id>/topology/instances/<node>/<idx>/attribute_notifications/<attr>/<node>/<idx>/<attr>
//! _orc/deployments/<id>/topology/relationship_instances/<node>/<req>/<idx>
//! ```

use orc_store::path::join;

/// Root of every deployment
pub const DEPLOYMENTS_PREFIX: &str = "_orc/deployments";

/// Stored topology of a deployment
#[must_use]
pub fn topology(deployment: &str) -> String {
    join([DEPLOYMENTS_PREFIX, deployment, "topology"])
}

/// Whole subtree of a deployment
#[must_use]
pub fn deployment(deployment: &str) -> String {
    join([DEPLOYMENTS_PREFIX, deployment])
}

/// Deployment status
#[must_use]
pub fn status(deployment: &str) -> String {
    join([DEPLOYMENTS_PREFIX, deployment, "status"])
}

/// Type catalog
#[must_use]
pub fn types(deployment: &str) -> String {
    join([topology(deployment).as_str(), "types"])
}

/// One type definition
#[must_use]
pub fn type_def(deployment: &str, name: &str) -> String {
    join([types(deployment).as_str(), name])
}

/// Node templates
#[must_use]
pub fn nodes(deployment: &str) -> String {
    join([topology(deployment).as_str(), "nodes"])
}

/// One node template
#[must_use]
pub fn node(deployment: &str, node: &str) -> String {
    join([nodes(deployment).as_str(), node])
}

/// Instance count of a node
#[must_use]
pub fn nb_instances(deployment: &str, node_name: &str) -> String {
    join([node(deployment, node_name).as_str(), "nbInstances"])
}

/// Workflows
#[must_use]
pub fn workflows(deployment: &str) -> String {
    join([topology(deployment).as_str(), "workflows"])
}

/// One workflow
#[must_use]
pub fn workflow(deployment: &str, workflow: &str) -> String {
    join([workflows(deployment).as_str(), workflow])
}

/// One validated workflow step
#[must_use]
pub fn workflow_step(deployment: &str, workflow_name: &str, step: &str) -> String {
    join([workflow(deployment, workflow_name).as_str(), "steps", step])
}

/// Extension to implementation artifact type map
#[must_use]
pub fn implementation_extensions(deployment: &str) -> String {
    join([topology(deployment).as_str(), "implementation_artifacts_extensions"])
}

/// Instances of a node
#[must_use]
pub fn instances(deployment: &str, node: &str) -> String {
    join([topology(deployment).as_str(), "instances", node])
}

/// One instance
#[must_use]
pub fn instance(deployment: &str, node: &str, instance: &str) -> String {
    join([instances(deployment, node).as_str(), instance])
}

/// Instance attribute value
#[must_use]
pub fn instance_attribute(deployment: &str, node: &str, instance_id: &str, attribute: &str) -> String {
    join([instance(deployment, node, instance_id).as_str(), "attributes", attribute])
}

/// Instance capability attribute value
#[must_use]
pub fn capability_attribute(
    deployment: &str,
    node: &str,
    instance_id: &str,
    capability: &str,
    attribute: &str,
) -> String {
    join([
        instance(deployment, node, instance_id).as_str(),
        "capabilities",
        capability,
        "attributes",
        attribute,
    ])
}

/// Subscribers to changes of an instance attribute
#[must_use]
pub fn attribute_notifications(deployment: &str, node: &str, instance_id: &str, attribute: &str) -> String {
    join([
        instance(deployment, node, instance_id).as_str(),
        "attribute_notifications",
        attribute,
    ])
}

/// Relationship instances of a node
#[must_use]
pub fn relationship_instances(deployment: &str, node: &str) -> String {
    join([topology(deployment).as_str(), "relationship_instances", node])
}

/// One relationship instance
#[must_use]
pub fn relationship_instance(deployment: &str, node: &str, requirement: usize, instance: &str) -> String {
    join([
        relationship_instances(deployment, node).as_str(),
        requirement.to_string().as_str(),
        instance,
    ])
}
