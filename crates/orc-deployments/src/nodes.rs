//! Node template accessors

use crate::deployments::Deployments;
use crate::error::{NotFoundError, Result};
use crate::keys;
use orc_store::KvStoreExt;
use orc_tosca::normative::HOSTED_ON;
use orc_tosca::{Named, NodeTemplate, RequirementAssignment};
use std::collections::BTreeSet;

impl Deployments {
    /// Names of every node of the topology, sorted
    ///
    /// # Errors
    /// Returns store errors.
    pub async fn node_names(&self, deployment: &str) -> Result<Vec<String>> {
        Ok(self.store().child_keys(&keys::nodes(deployment)).await?)
    }

    /// Node template of `node`
    ///
    /// # Errors
    /// Returns [`NotFoundError::Node`] if the node is not in the topology.
    pub async fn node_template(&self, deployment: &str, node: &str) -> Result<NodeTemplate> {
        self.store()
            .get_json(&keys::node(deployment, node))
            .await?
            .ok_or_else(|| {
                NotFoundError::Node {
                    deployment: deployment.to_string(),
                    name: node.to_string(),
                }
                .into()
            })
    }

    /// Type name of `node`
    ///
    /// # Errors
    /// Returns [`NotFoundError::Node`] if the node is not in the topology.
    pub async fn node_type(&self, deployment: &str, node: &str) -> Result<String> {
        Ok(self.node_template(deployment, node).await?.type_name)
    }

    /// Check whether the type of `node` is, or derives from, `ancestor`
    ///
    /// # Errors
    /// Returns not found errors for the node or its types.
    pub async fn is_node_derived_from(&self, deployment: &str, node: &str, ancestor: &str) -> Result<bool> {
        let node_type = self.node_type(deployment, node).await?;
        self.types().is_derived_from(deployment, &node_type, ancestor).await
    }

    /// Relationship type of a requirement
    ///
    /// Falls back to the requirement definition of the node type.
    pub(crate) async fn requirement_relationship(
        &self,
        deployment: &str,
        template: &NodeTemplate,
        requirement: &Named<RequirementAssignment>,
    ) -> Result<Option<String>> {
        if !requirement.value.relationship.is_empty() {
            return Ok(Some(requirement.value.relationship.clone()));
        }
        Ok(self
            .types()
            .requirement_definition(deployment, &template.type_name, &requirement.name)
            .await?
            .map(|def| def.relationship)
            .filter(|r| !r.is_empty()))
    }

    /// Capability type of a requirement
    ///
    /// Falls back to the requirement definition of the node type.
    pub(crate) async fn requirement_capability(
        &self,
        deployment: &str,
        template: &NodeTemplate,
        requirement: &Named<RequirementAssignment>,
    ) -> Result<Option<String>> {
        if !requirement.value.capability.is_empty() {
            return Ok(Some(requirement.value.capability.clone()));
        }
        Ok(self
            .types()
            .requirement_definition(deployment, &template.type_name, &requirement.name)
            .await?
            .map(|def| def.capability)
            .filter(|c| !c.is_empty()))
    }

    /// Node hosting `node`, if any
    ///
    /// The host is the target of the first requirement whose relationship
    /// derives from `tosca.relationships.HostedOn`.
    ///
    /// # Errors
    /// Returns not found errors for the node or the relationship types.
    pub async fn hosted_on_node(&self, deployment: &str, node: &str) -> Result<Option<String>> {
        let template = self.node_template(deployment, node).await?;
        for requirement in &template.requirements {
            if requirement.value.node.is_empty() {
                continue;
            }
            let Some(relationship) = self.requirement_relationship(deployment, &template, requirement).await? else {
                continue;
            };
            if self.types().is_derived_from(deployment, &relationship, HOSTED_ON).await? {
                return Ok(Some(requirement.value.node.clone()));
            }
        }
        Ok(None)
    }

    /// Target of the first `requirement` whose capability derives from `capability_type`
    ///
    /// # Errors
    /// Returns not found errors for the node or the capability types.
    pub async fn has_requirement_capability(
        &self,
        deployment: &str,
        node: &str,
        requirement: &str,
        capability_type: &str,
    ) -> Result<Option<String>> {
        let template = self.node_template(deployment, node).await?;
        for candidate in template.requirements.iter().filter(|r| r.name == requirement) {
            if candidate.value.node.is_empty() {
                continue;
            }
            let Some(capability) = self.requirement_capability(deployment, &template, candidate).await? else {
                continue;
            };
            if self.types().is_derived_from(deployment, &capability, capability_type).await? {
                return Ok(Some(candidate.value.node.clone()));
            }
        }
        Ok(None)
    }

    /// Every attribute name of `node`: declared by its types or assigned by the template
    ///
    /// # Errors
    /// Returns not found errors for the node or its types.
    pub async fn node_attribute_names(&self, deployment: &str, node: &str) -> Result<BTreeSet<String>> {
        let template = self.node_template(deployment, node).await?;
        let mut names = self.types().attribute_names(deployment, &template.type_name).await?;
        names.extend(template.attributes.into_keys());
        Ok(names)
    }
}
