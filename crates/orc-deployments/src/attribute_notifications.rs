//! Attribute enhancement
//!
//! For every attribute of every instance:
//! - a `get_attribute` default subscribes the instance attribute to the
//!   attribute it reads, so that a later write there triggers re-resolution
//! - a literal non-empty default is published when the instance has no value

use crate::deployments::Deployments;
use crate::error::{Result, ValidationError};
use crate::keys;
use orc_store::{path, KvStoreExt, StoreContext};
use orc_tosca::function::{GET_ATTRIBUTE, HOST, SELF};
use orc_tosca::{Function, NodeTemplate, ValueAssignment};

/// Instance attribute to re-resolve when the watched attribute changes
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AttributeSubscriber {
    /// Node name
    pub node: String,
    /// Instance id
    pub instance: String,
    /// Attribute name
    pub attribute: String,
}

impl Deployments {
    /// Register notifications and publish defaults for every attribute of `node`
    pub(crate) async fn enhance_node_attributes(&self, ctx: &StoreContext, deployment: &str, node: &str) -> Result<()> {
        let template = self.node_template(deployment, node).await?;
        let instances = self.node_instance_ids(deployment, node).await?;
        if instances.is_empty() {
            return Ok(());
        }

        for attribute in self.node_attribute_names(deployment, node).await? {
            match self.attribute_assignment(deployment, &template, &attribute).await? {
                Some(ValueAssignment::Function(function)) => {
                    for instance in &instances {
                        self.add_attribute_notifications(ctx, deployment, node, instance, &attribute, &function)
                            .await?;
                    }
                }
                Some(ValueAssignment::Literal(value)) if !value.is_empty() => {
                    for instance in &instances {
                        if self.instance_attribute(deployment, node, instance, &attribute).await?.is_none() {
                            ctx.set_json(keys::instance_attribute(deployment, node, instance, &attribute), &value)?;
                        }
                    }
                }
                _ => {}
            }
        }
        tracing::debug!(deployment, node, "attributes enhanced");
        Ok(())
    }

    /// Assignment of `attribute` on the template, else the type default
    async fn attribute_assignment(
        &self,
        deployment: &str,
        template: &NodeTemplate,
        attribute: &str,
    ) -> Result<Option<ValueAssignment>> {
        if let Some(assignment) = template.attributes.get(attribute) {
            return Ok(Some(assignment.clone()));
        }
        Ok(self
            .types()
            .attribute_definition(deployment, &template.type_name, attribute)
            .await?
            .and_then(|def| def.default))
    }

    async fn add_attribute_notifications(
        &self,
        ctx: &StoreContext,
        deployment: &str,
        node: &str,
        instance: &str,
        attribute: &str,
        function: &Function,
    ) -> Result<()> {
        for call in function.functions_by_operator(GET_ATTRIBUTE) {
            if call.operands.len() < 2 {
                return Err(ValidationError::MalformedFunction {
                    operator: GET_ATTRIBUTE.to_string(),
                    function: call.to_string(),
                    expected: 2,
                    actual: call.operands.len(),
                }
                .into());
            }
            let entity = call.operand(0).unwrap_or_default();
            let watched = call.operand(call.operands.len() - 1).unwrap_or_default();

            let targets = match entity.as_str() {
                SELF => vec![(node.to_string(), instance.to_string())],
                HOST => match self.hosted_on_node(deployment, node).await? {
                    Some(host) => vec![(host, instance.to_string())],
                    None => {
                        self.soft_skip(deployment, node, &format!("no host to watch for {call}"));
                        continue;
                    }
                },
                other => {
                    if !self.store().exists(&keys::node(deployment, other)).await? {
                        self.soft_skip(deployment, node, &format!("unsupported entity {other:?} in {call}"));
                        continue;
                    }
                    self.node_instance_ids(deployment, other)
                        .await?
                        .into_iter()
                        .map(|id| (other.to_string(), id))
                        .collect()
                }
            };

            for (target_node, target_instance) in targets {
                let key = path::join([
                    keys::attribute_notifications(deployment, &target_node, &target_instance, &watched).as_str(),
                    node,
                    instance,
                    attribute,
                ]);
                ctx.set_string(key, "");
            }
        }
        Ok(())
    }

    /// Subscribers to changes of an instance attribute
    ///
    /// # Errors
    /// Returns store errors.
    pub async fn attribute_notifications(
        &self,
        deployment: &str,
        node: &str,
        instance: &str,
        attribute: &str,
    ) -> Result<Vec<AttributeSubscriber>> {
        let prefix = keys::attribute_notifications(deployment, node, instance, attribute);
        let mut subscribers: Vec<_> = self
            .store()
            .list(&prefix)
            .await?
            .into_iter()
            .filter_map(|pair| {
                let rest = pair.key.strip_prefix(prefix.as_str())?.trim_start_matches('/');
                let mut segments = rest.split('/');
                match (segments.next(), segments.next(), segments.next(), segments.next()) {
                    (Some(node), Some(instance), Some(attribute), None) => Some(AttributeSubscriber {
                        node: node.to_string(),
                        instance: instance.to_string(),
                        attribute: attribute.to_string(),
                    }),
                    _ => None,
                }
            })
            .collect();
        subscribers.sort();
        Ok(subscribers)
    }
}
