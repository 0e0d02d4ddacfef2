//! Workflow enhancement
//!
//! Runs after relationship instances exist and before attribute
//! enhancement. The default [`StepValidator`] checks step references and
//! persists each step on its own key for the workflow engine.

use crate::error::{Result, ValidationError};
use crate::keys;
use async_trait::async_trait;
use orc_store::{KvStoreExt, StoreContext};
use orc_tosca::Workflow;
use std::collections::BTreeMap;

/// Pipeline step turning stored workflows into executable ones
#[async_trait]
pub trait WorkflowEnhancer: Send + Sync + std::fmt::Debug {
    /// Enhance every workflow of `deployment`
    ///
    /// Writes go through `ctx`; the caller flushes.
    async fn enhance(&self, ctx: &StoreContext, deployment: &str) -> Result<()>;
}

/// Validates step references and stores steps
#[derive(Debug, Clone, Copy, Default)]
pub struct StepValidator;

impl StepValidator {
    fn check(name: &str, workflow: &Workflow, nodes: &[String]) -> Result<()> {
        for (step_name, step) in &workflow.steps {
            let invalid = |reason: String| ValidationError::InvalidWorkflow {
                workflow: name.to_string(),
                step: step_name.clone(),
                reason,
            };
            if !nodes.iter().any(|n| *n == step.node) {
                return Err(invalid(format!("unknown node {:?}", step.node)).into());
            }
            if let Some(next) = step.on_success.iter().find(|s| !workflow.steps.contains_key(*s)) {
                return Err(invalid(format!("unknown on_success step {next:?}")).into());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl WorkflowEnhancer for StepValidator {
    async fn enhance(&self, ctx: &StoreContext, deployment: &str) -> Result<()> {
        let store = ctx.store();
        let nodes = store.child_keys(&keys::nodes(deployment)).await?;
        let names = store.child_keys(&keys::workflows(deployment)).await?;

        let mut workflows = BTreeMap::new();
        for name in names {
            if let Some(workflow) = store.get_json::<Workflow>(&keys::workflow(deployment, &name)).await? {
                workflows.insert(name, workflow);
            }
        }

        for (name, workflow) in &workflows {
            Self::check(name, workflow, &nodes)?;
            for (step_name, step) in &workflow.steps {
                ctx.set_json(keys::workflow_step(deployment, name, step_name), step)?;
            }
            tracing::debug!(deployment, workflow = %name, steps = workflow.steps.len(), "workflow validated");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeploymentError;
    use orc_store::{KvStore, MemoryStore};
    use orc_tosca::{Activity, Step};
    use std::sync::Arc;

    fn step(node: &str, next: &[&str]) -> Step {
        Step {
            node: node.to_string(),
            activity: Activity::CallOperation("Standard.create".into()),
            on_success: next.iter().map(ToString::to_string).collect(),
        }
    }

    async fn context_with(workflow: Workflow) -> StoreContext {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        store.set_string(&keys::node("d", "Web"), "{}").await.unwrap();
        store.set_json(&keys::workflow("d", "install"), &workflow).await.unwrap();
        StoreContext::new(store)
    }

    #[tokio::test]
    async fn valid_workflow_steps_are_stored() {
        let mut workflow = Workflow::default();
        workflow.steps.insert("create".into(), step("Web", &["start"]));
        workflow.steps.insert("start".into(), step("Web", &[]));
        let ctx = context_with(workflow).await;

        StepValidator.enhance(&ctx, "d").await.unwrap();
        ctx.flush().await.unwrap();

        let stored: Step = ctx
            .store()
            .get_json(&keys::workflow_step("d", "install", "create"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.on_success, vec!["start".to_string()]);
    }

    #[tokio::test]
    async fn unknown_node_is_rejected() {
        let mut workflow = Workflow::default();
        workflow.steps.insert("create".into(), step("Db", &[]));
        let ctx = context_with(workflow).await;

        let err = StepValidator.enhance(&ctx, "d").await.unwrap_err();
        assert!(matches!(
            err,
            DeploymentError::Validation(ValidationError::InvalidWorkflow { ref step, .. }) if step == "create"
        ));
    }

    #[tokio::test]
    async fn dangling_on_success_is_rejected() {
        let mut workflow = Workflow::default();
        workflow.steps.insert("create".into(), step("Web", &["configure"]));
        let ctx = context_with(workflow).await;

        let err = StepValidator.enhance(&ctx, "d").await.unwrap_err();
        assert!(err.to_string().contains("configure"));
    }
}
