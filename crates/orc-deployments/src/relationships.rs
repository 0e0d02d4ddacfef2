//! Relationship instances
//!
//! One record per (source node, requirement index, source instance), written
//! once both ends have their final instance count.

use crate::deployments::Deployments;
use crate::error::{NotFoundError, Result};
use crate::keys;
use orc_store::{KvStoreExt, StoreContext, StoreError};
use serde::{Deserialize, Serialize};

/// Materialized requirement of one source instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipInstance {
    /// Requirement name
    pub requirement: String,
    /// Target node
    pub target: String,
    /// Target instance ids
    pub target_instances: Vec<String>,
    /// Relationship type
    pub relationship_type: String,
}

/// Stored relationship instance with its position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipInstanceRecord {
    /// Requirement index in the source template
    pub requirement_index: usize,
    /// Source instance id
    pub instance: String,
    /// Record
    pub relationship: RelationshipInstance,
}

impl Deployments {
    /// Queue relationship instances of every requirement of `node`
    ///
    /// Requirements without target node are not materialized.
    ///
    /// # Errors
    /// Returns [`NotFoundError::RequirementTarget`] when the target is not a
    /// node of the topology.
    pub(crate) async fn create_relationship_instances(
        &self,
        ctx: &StoreContext,
        deployment: &str,
        node: &str,
    ) -> Result<()> {
        let template = self.node_template(deployment, node).await?;
        let sources = self.node_instance_ids(deployment, node).await?;
        if sources.is_empty() {
            return Ok(());
        }

        for (index, requirement) in template.requirements.iter().enumerate() {
            let target = &requirement.value.node;
            if target.is_empty() {
                continue;
            }
            if !self.store().exists(&keys::node(deployment, target)).await? {
                return Err(NotFoundError::RequirementTarget {
                    node: node.to_string(),
                    requirement: index,
                }
                .into());
            }
            let relationship = RelationshipInstance {
                requirement: requirement.name.clone(),
                target: target.clone(),
                target_instances: self.node_instance_ids(deployment, target).await?,
                relationship_type: self
                    .requirement_relationship(deployment, &template, requirement)
                    .await?
                    .unwrap_or_default(),
            };
            for source in &sources {
                ctx.set_json(keys::relationship_instance(deployment, node, index, source), &relationship)?;
            }
        }
        tracing::debug!(deployment, node, "relationship instances queued");
        Ok(())
    }

    /// Relationship instances whose source is `node`
    ///
    /// # Errors
    /// Returns store errors.
    pub async fn relationship_instances(
        &self,
        deployment: &str,
        node: &str,
    ) -> Result<Vec<RelationshipInstanceRecord>> {
        let prefix = keys::relationship_instances(deployment, node);
        let mut records = Vec::new();
        for pair in self.store().list(&prefix).await? {
            let Some(rest) = pair.key.strip_prefix(prefix.as_str()) else {
                continue;
            };
            let mut segments = rest.trim_start_matches('/').split('/');
            let (Some(index), Some(instance), None) = (segments.next(), segments.next(), segments.next()) else {
                continue;
            };
            let Ok(requirement_index) = index.parse::<usize>() else {
                continue;
            };
            let relationship = serde_json::from_slice(&pair.value)
                .map_err(|e| StoreError::decode(pair.key.as_str(), e))?;
            records.push(RelationshipInstanceRecord {
                requirement_index,
                instance: instance.to_string(),
                relationship,
            });
        }
        Ok(records)
    }
}
