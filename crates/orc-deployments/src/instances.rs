//! Node instances
//!
//! An instance is identified by its index under the node. Creating
//! instances writes the node's `nbInstances` and, per instance, the
//! `state`, `tosca_name` and `tosca_id` attributes.

use crate::deployments::Deployments;
use crate::error::{Result, ValidationError};
use crate::keys;
use orc_store::{KvStoreExt, StoreContext};
use orc_tosca::normative::{DEFAULT_INSTANCES, SCALABLE};
use orc_tosca::{Value, ValueAssignment};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a node instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    /// Not deployed yet
    Initial,
    /// Being created
    Creating,
    /// Created
    Created,
    /// Being configured
    Configuring,
    /// Configured
    Configured,
    /// Starting
    Starting,
    /// Started
    Started,
    /// Stopping
    Stopping,
    /// Stopped
    Stopped,
    /// Being deleted
    Deleting,
    /// Deleted
    Deleted,
    /// Failed
    Error,
}

impl NodeState {
    /// Name as stored
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Creating => "creating",
            Self::Created => "created",
            Self::Configuring => "configuring",
            Self::Configured => "configured",
            Self::Starting => "starting",
            Self::Started => "started",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let state = match s.to_ascii_lowercase().as_str() {
            "initial" => Self::Initial,
            "creating" => Self::Creating,
            "created" => Self::Created,
            "configuring" => Self::Configuring,
            "configured" => Self::Configured,
            "starting" => Self::Starting,
            "started" => Self::Started,
            "stopping" => Self::Stopping,
            "stopped" => Self::Stopped,
            "deleting" => Self::Deleting,
            "deleted" => Self::Deleted,
            "error" => Self::Error,
            other => return Err(format!("unknown node state {other:?}")),
        };
        Ok(state)
    }
}

fn parse_count(node: &str, value: &str) -> Result<usize> {
    value.trim().parse::<usize>().map_err(|_| {
        ValidationError::InvalidInstanceCount {
            node: node.to_string(),
            value: value.to_string(),
        }
        .into()
    })
}

impl Deployments {
    /// Queue `count` instances of `node` in state `initial`
    ///
    /// # Errors
    /// Returns encoding errors.
    pub(crate) fn create_node_instances(
        &self,
        ctx: &StoreContext,
        deployment: &str,
        node: &str,
        count: usize,
    ) -> Result<()> {
        ctx.set_string(keys::nb_instances(deployment, node), count.to_string());
        for index in 0..count {
            let id = index.to_string();
            let attribute = |name: &str| keys::instance_attribute(deployment, node, &id, name);
            ctx.set_json(attribute("state"), &Value::scalar(NodeState::Initial.as_str()))?;
            ctx.set_json(attribute("tosca_name"), &Value::scalar(node))?;
            ctx.set_json(attribute("tosca_id"), &Value::scalar(format!("{node}-{id}")))?;
        }
        tracing::debug!(deployment, node, count, "node instances queued");
        Ok(())
    }

    /// Recreate instances of `node` for `count` and drop those above it
    ///
    /// # Errors
    /// Returns store and encoding errors.
    pub(crate) async fn resize_instances(
        &self,
        ctx: &StoreContext,
        deployment: &str,
        node: &str,
        count: usize,
    ) -> Result<()> {
        for id in self.node_instance_ids(deployment, node).await? {
            if id.parse::<usize>().map_or(true, |index| index >= count) {
                ctx.delete_tree(keys::instance(deployment, node, &id));
            }
        }
        self.create_node_instances(ctx, deployment, node, count)
    }

    /// Instance ids of `node`, in index order
    ///
    /// # Errors
    /// Returns store errors.
    pub async fn node_instance_ids(&self, deployment: &str, node: &str) -> Result<Vec<String>> {
        let mut ids = self.store().child_keys(&keys::instances(deployment, node)).await?;
        ids.sort_by_key(|id| (id.parse::<u64>().unwrap_or(u64::MAX), id.clone()));
        Ok(ids)
    }

    /// Persisted instance count of `node`, 0 when not materialized
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidInstanceCount`] if the stored count is
    /// not a number.
    pub async fn nb_instances(&self, deployment: &str, node: &str) -> Result<usize> {
        match self.store().get_string(&keys::nb_instances(deployment, node)).await? {
            Some(value) => parse_count(node, &value),
            None => Ok(0),
        }
    }

    /// Declared instance count of `node`
    ///
    /// The `scalable` capability's `default_instances` of the node, or else
    /// of its hosts walking down the hosting chain. Defaults to 1.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidInstanceCount`] for a non-numeric
    /// declaration, and not found errors.
    pub async fn default_nb_instances(&self, deployment: &str, node: &str) -> Result<usize> {
        let mut visited = BTreeSet::new();
        let mut current = node.to_string();
        loop {
            let template = self.node_template(deployment, &current).await?;
            let declared = template
                .capability_property(SCALABLE, DEFAULT_INSTANCES)
                .and_then(ValueAssignment::literal_value)
                .and_then(Value::as_scalar);
            if let Some(value) = declared {
                return parse_count(&current, value);
            }
            visited.insert(current.clone());
            match self.hosted_on_node(deployment, &current).await? {
                Some(host) if !visited.contains(&host) => current = host,
                _ => return Ok(1),
            }
        }
    }

    /// Stored value of an instance attribute
    ///
    /// # Errors
    /// Returns store errors.
    pub async fn instance_attribute(
        &self,
        deployment: &str,
        node: &str,
        instance: &str,
        attribute: &str,
    ) -> Result<Option<Value>> {
        Ok(self
            .store()
            .get_json(&keys::instance_attribute(deployment, node, instance, attribute))
            .await?)
    }

    /// Instance attribute value, else the literal assigned by the template,
    /// else the literal default of the type
    ///
    /// # Errors
    /// Returns store and not found errors.
    pub async fn instance_attribute_or_default(
        &self,
        deployment: &str,
        node: &str,
        instance: &str,
        attribute: &str,
    ) -> Result<Option<Value>> {
        if let Some(value) = self.instance_attribute(deployment, node, instance, attribute).await? {
            return Ok(Some(value));
        }
        let template = self.node_template(deployment, node).await?;
        if let Some(value) = template.attributes.get(attribute).and_then(ValueAssignment::literal_value) {
            return Ok(Some(value.clone()));
        }
        Ok(self
            .types()
            .attribute_definition(deployment, &template.type_name, attribute)
            .await?
            .and_then(|def| def.default)
            .and_then(|default| default.literal_value().cloned()))
    }

    /// Stored value of an instance capability attribute
    ///
    /// # Errors
    /// Returns store errors.
    pub async fn capability_attribute(
        &self,
        deployment: &str,
        node: &str,
        instance: &str,
        capability: &str,
        attribute: &str,
    ) -> Result<Option<Value>> {
        Ok(self
            .store()
            .get_json(&keys::capability_attribute(deployment, node, instance, capability, attribute))
            .await?)
    }

    /// Overwrite an instance attribute
    ///
    /// # Errors
    /// Returns store errors.
    pub async fn set_instance_attribute(
        &self,
        deployment: &str,
        node: &str,
        instance: &str,
        attribute: &str,
        value: &Value,
    ) -> Result<()> {
        self.store()
            .set_json(&keys::instance_attribute(deployment, node, instance, attribute), value)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_names_round_trip() {
        for state in [NodeState::Initial, NodeState::Started, NodeState::Error] {
            assert_eq!(state.as_str().parse::<NodeState>(), Ok(state));
        }
        assert_eq!("STARTED".parse::<NodeState>(), Ok(NodeState::Started));
        assert!("running".parse::<NodeState>().is_err());
    }

    #[test]
    fn count_must_be_numeric() {
        assert_eq!(parse_count("DB", " 3 ").unwrap(), 3);
        assert!(parse_count("DB", "two").is_err());
        assert!(parse_count("DB", "-1").is_err());
    }
}
