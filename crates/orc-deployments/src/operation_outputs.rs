//! Output-binding repair
//!
//! A `get_operation_output` reference in a value assignment only resolves at
//! runtime if the referenced operation declares the output. The repair scans
//! the node type, and the relationship type of each requirement, and
//! registers every referenced output on the type implementing the operation.
//!
//! Entity keywords:
//! - `SELF` / `SOURCE`: the node's own type
//! - `HOST`: the type of the hosting node; a missing host is an error
//! - `TARGET`: the type of the requirement target (relationship context only)
//!
//! Anything else is skipped with a warning.

use crate::deployments::Deployments;
use crate::error::{NotFoundError, Result, ValidationError};
use crate::keys;
use orc_store::KvStoreExt;
use orc_tosca::function::{GET_OPERATION_OUTPUT, HOST, SELF, SOURCE, TARGET};
use orc_tosca::{Function, Named, RequirementAssignment, TypeDef, ValueAssignment};

/// Operand count of `get_operation_output`: entity, interface, operation, output
const OPERATION_OUTPUT_OPERANDS: usize = 4;

fn output_references(def: &TypeDef) -> Vec<Function> {
    def.value_assignments()
        .filter_map(ValueAssignment::function)
        .flat_map(|f| f.functions_by_operator(GET_OPERATION_OUTPUT))
        .cloned()
        .collect()
}

impl Deployments {
    /// Register every output referenced by the types of `node`
    ///
    /// # Errors
    /// Returns [`ValidationError::MalformedFunction`] for a reference without
    /// four operands, [`NotFoundError::HostedOn`] for a `HOST` reference on a
    /// node without host, and store or not found errors.
    pub(crate) async fn fix_operation_outputs(&self, deployment: &str, node: &str) -> Result<()> {
        let template = self.node_template(deployment, node).await?;
        let node_type = self.types().get_type(deployment, &template.type_name).await?;

        for reference in output_references(&node_type) {
            self.fix_node_reference(deployment, node, &template.type_name, &reference)
                .await?;
        }

        for requirement in &template.requirements {
            let Some(relationship) = self.requirement_relationship(deployment, &template, requirement).await? else {
                continue;
            };
            let relationship_type = self.types().get_type(deployment, &relationship).await?;
            for reference in output_references(&relationship_type) {
                self.fix_relationship_reference(deployment, node, &template.type_name, requirement, &reference)
                    .await?;
            }
        }
        Ok(())
    }

    async fn fix_node_reference(
        &self,
        deployment: &str,
        node: &str,
        node_type: &str,
        reference: &Function,
    ) -> Result<()> {
        check_operands(reference)?;
        let entity = reference.operand(0).unwrap_or_default();
        let owner = match entity.as_str() {
            SELF | SOURCE => node_type.to_string(),
            HOST => self.host_type(deployment, node).await?,
            other => {
                self.soft_skip(
                    deployment,
                    node,
                    &format!("entity {other:?} of operation output on node is not handled"),
                );
                return Ok(());
            }
        };
        self.register_operation_output(deployment, node, &owner, reference).await
    }

    async fn fix_relationship_reference(
        &self,
        deployment: &str,
        node: &str,
        node_type: &str,
        requirement: &Named<RequirementAssignment>,
        reference: &Function,
    ) -> Result<()> {
        check_operands(reference)?;
        let entity = reference.operand(0).unwrap_or_default();
        let owner = match entity.as_str() {
            SELF | SOURCE => node_type.to_string(),
            HOST => self.host_type(deployment, node).await?,
            TARGET if !requirement.value.node.is_empty() => {
                self.node_type(deployment, &requirement.value.node).await?
            }
            other => {
                self.soft_skip(
                    deployment,
                    node,
                    &format!(
                        "entity {other:?} of operation output on relationship {:?} is not handled",
                        requirement.name
                    ),
                );
                return Ok(());
            }
        };
        self.register_operation_output(deployment, node, &owner, reference).await
    }

    async fn host_type(&self, deployment: &str, node: &str) -> Result<String> {
        match self.hosted_on_node(deployment, node).await? {
            Some(host) => self.node_type(deployment, &host).await,
            None => Err(NotFoundError::HostedOn { node: node.to_string() }.into()),
        }
    }

    /// Declare the referenced output on the type implementing the operation
    async fn register_operation_output(
        &self,
        deployment: &str,
        node: &str,
        type_name: &str,
        reference: &Function,
    ) -> Result<()> {
        let interface = reference.operand(1).unwrap_or_default();
        let operation = reference.operand(2).unwrap_or_default();
        let output = reference.operand(3).unwrap_or_default();

        let qualified = format!("{interface}.{operation}");
        let Some(implementing) = self
            .types()
            .type_implementing_operation(deployment, type_name, &qualified)
            .await?
        else {
            self.soft_skip(
                deployment,
                node,
                &format!("no type in the hierarchy of {type_name:?} implements {qualified}"),
            );
            return Ok(());
        };

        // Types are shared by nodes repaired concurrently
        let key = keys::type_def(deployment, &implementing);
        let _guard = self.locks().lock(&key).await;
        let mut def = self.types().get_type(deployment, &implementing).await?;
        let Some(declared) = def.operation_mut(&interface, &operation) else {
            self.soft_skip(
                deployment,
                node,
                &format!("operation {qualified} not found on type {implementing:?}"),
            );
            return Ok(());
        };
        declared
            .outputs
            .insert(output.clone(), ValueAssignment::Function(reference.clone()));
        self.store().set_json(&key, &def).await?;

        tracing::debug!(deployment, node, type_name = %implementing, operation = %qualified, output = %output, "operation output registered");
        Ok(())
    }
}

fn check_operands(reference: &Function) -> Result<()> {
    if reference.operands.len() == OPERATION_OUTPUT_OPERANDS {
        return Ok(());
    }
    Err(ValidationError::MalformedFunction {
        operator: GET_OPERATION_OUTPUT.to_string(),
        function: reference.to_string(),
        expected: OPERATION_OUTPUT_OPERANDS,
        actual: reference.operands.len(),
    }
    .into())
}
