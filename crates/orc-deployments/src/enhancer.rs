//! Instance Enhancer
//!
//! Strictly ordered pipeline over every node of a topology:
//!
//! 1. output-binding repair and 2. instance materialization, per node,
//!    concurrently; barrier 1
//! 3. sibling and block storage backfill to the consumer's instance count
//! 4. relationship materialization, per node, concurrently; barrier 2
//! 5. workflow enhancement
//! 6. attribute enhancement, sequentially
//!
//! Each concurrent phase shares one write context and one cancellation
//! signal between its tasks. The first failing task cancels the phase and
//! aborts the pipeline; writes already issued are not rolled back.

use crate::deployments::Deployments;
use crate::error::Result;
use crate::keys;
use orc_store::{KvStoreExt, StoreContext};
use orc_tasks::{CancelSignal, TaskGroup};
use orc_tosca::normative::{
    ASSIGNABLE, ASSIGNMENT, ATTACHMENT, BLOCK_STORAGE, COMPUTE, DEVICE, FIP_CONNECTIVITY, LOCAL_STORAGE, NETWORK,
};
use orc_tosca::{Named, NodeTemplate};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of materializing one node
#[derive(Debug, Clone, PartialEq, Eq)]
struct Materialized {
    node: String,
    count: usize,
    is_compute: bool,
    /// Floating IP and assignable nodes sized after this one
    siblings: Vec<String>,
}

/// Block storages attached to a compute template
fn local_storages(template: &NodeTemplate) -> Vec<String> {
    template
        .requirements_named(LOCAL_STORAGE)
        .filter(|(_, r)| !r.capability.is_empty() && !r.node.is_empty())
        .map(|(_, r)| r.node.clone())
        .collect()
}

impl Deployments {
    /// Enhance every node of `deployment`
    ///
    /// Type chains of the deployment are cached for the duration of the run.
    ///
    /// # Errors
    /// Returns the first error of any phase. The topology is then partially
    /// enhanced.
    pub async fn enhance_nodes(&self, deployment: &str) -> Result<()> {
        self.types().begin_run(deployment);
        let result = self.run_pipeline(deployment).await;
        self.types().end_run(deployment);
        result
    }

    async fn run_pipeline(&self, deployment: &str) -> Result<()> {
        let nodes = self.node_names(deployment).await?;
        info!(deployment, nodes = nodes.len(), "enhancing topology");

        let materialized = self
            .run_phase(deployment, &nodes, |this, ctx, deployment, node| async move {
                this.create_instances_and_fix_model(&ctx, &deployment, &node).await
            })
            .await?;
        info!(deployment, "instances materialized");

        self.backfill_instances(deployment, &nodes, materialized.into_iter().flatten().collect())
            .await?;

        self.run_phase(deployment, &nodes, |this, ctx, deployment, node| async move {
            this.create_relationship_instances(&ctx, &deployment, &node).await
        })
        .await?;
        info!(deployment, "relationship instances materialized");

        let ctx = StoreContext::new(Arc::clone(self.store()));
        self.workflow_enhancer().enhance(&ctx, deployment).await?;
        ctx.flush().await?;
        info!(deployment, "workflows enhanced");

        let ctx = StoreContext::new(Arc::clone(self.store()));
        for node in &nodes {
            self.enhance_node_attributes(&ctx, deployment, node).await?;
        }
        ctx.flush().await?;
        info!(deployment, "topology enhanced");
        Ok(())
    }

    /// Run `task` for every node concurrently, then flush the shared context
    ///
    /// A task error is preferred over the flush error it caused.
    async fn run_phase<T, F, Fut>(&self, deployment: &str, nodes: &[String], task: F) -> Result<Vec<T>>
    where
        T: Send + 'static,
        F: Fn(Self, Arc<StoreContext>, String, String) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let limit = self.config().max_concurrent_tasks;
        let signal = CancelSignal::new();
        let ctx = Arc::new(StoreContext::with_signal(
            Arc::clone(self.store()),
            limit,
            signal.clone(),
        ));
        let group = TaskGroup::with_signal(limit, signal);
        for node in nodes {
            group.spawn(task(
                self.clone(),
                Arc::clone(&ctx),
                deployment.to_string(),
                node.clone(),
            ));
        }

        let outcome = group.wait().await;
        let flushed = ctx.flush().await;
        let results = outcome?;
        flushed?;
        Ok(results)
    }

    /// Repair outputs, then create instances of `node` and of its siblings
    ///
    /// Substitution-mapped nodes get no instances.
    async fn create_instances_and_fix_model(
        &self,
        ctx: &StoreContext,
        deployment: &str,
        node: &str,
    ) -> Result<Option<Materialized>> {
        self.fix_operation_outputs(deployment, node).await?;

        let template = self.node_template(deployment, node).await?;
        if template.is_substitutable() {
            debug!(deployment, node, "substitution-mapped node skipped");
            return Ok(None);
        }

        let count = self.default_nb_instances(deployment, node).await?;
        self.create_node_instances(ctx, deployment, node, count)?;

        let mut siblings = Vec::new();
        for (requirement, capability) in [(NETWORK, FIP_CONNECTIVITY), (ASSIGNMENT, ASSIGNABLE)] {
            if let Some(sibling) = self
                .has_requirement_capability(deployment, node, requirement, capability)
                .await?
            {
                self.create_node_instances(ctx, deployment, &sibling, count)?;
                siblings.push(sibling);
            }
        }
        for storage in local_storages(&template) {
            self.create_node_instances(ctx, deployment, &storage, count)?;
        }

        self.fix_block_storage_attachments(deployment, node).await?;

        Ok(Some(Materialized {
            node: node.to_string(),
            count,
            is_compute: self.is_node_derived_from(deployment, node, COMPUTE).await?,
            siblings,
        }))
    }

    /// Move `attachment` requirements of a block storage onto its compute
    ///
    /// The compute gets a `local_storage` requirement targeting the storage,
    /// carrying the storage `device` property as relationship property.
    async fn fix_block_storage_attachments(&self, deployment: &str, node: &str) -> Result<()> {
        if !self.is_node_derived_from(deployment, node, BLOCK_STORAGE).await? {
            return Ok(());
        }
        let template = self.node_template(deployment, node).await?;
        let device = template.properties.get(DEVICE).cloned();

        for (_, attachment) in template.requirements_named(ATTACHMENT) {
            if attachment.node.is_empty() {
                continue;
            }
            let compute = attachment.node.clone();
            let mut reversed = attachment.clone();
            reversed.node = node.to_string();
            if let Some(device) = &device {
                reversed.relationship_props.insert(DEVICE.to_string(), device.clone());
            }

            // Several storages may attach to one compute
            let key = keys::node(deployment, &compute);
            let _guard = self.locks().lock(&key).await;
            let mut target = self.node_template(deployment, &compute).await?;
            target.requirements.push(Named::new(LOCAL_STORAGE, reversed));
            self.store().set_json(&key, &target).await?;
            debug!(deployment, storage = node, compute = %compute, "block storage attachment reversed");
        }
        Ok(())
    }

    /// Size siblings and attached block storages after their consumer
    ///
    /// Runs after barrier 1, so it wins over the storage's own count. A node
    /// sized by several consumers takes the count of the last one in
    /// node order, and is resized once.
    async fn backfill_instances(
        &self,
        deployment: &str,
        nodes: &[String],
        mut materialized: Vec<Materialized>,
    ) -> Result<()> {
        materialized.sort_by_key(|m| nodes.iter().position(|n| *n == m.node));

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for consumer in &materialized {
            let mut sized = consumer.siblings.clone();
            if consumer.is_compute {
                let template = self.node_template(deployment, &consumer.node).await?;
                sized.extend(local_storages(&template));
            }
            for node in sized {
                if let Some(previous) = counts.insert(node.clone(), consumer.count) {
                    if previous != consumer.count {
                        debug!(
                            deployment,
                            node = %node,
                            previous,
                            count = consumer.count,
                            "consumers disagree on instance count"
                        );
                    }
                }
            }
        }

        let ctx = StoreContext::with_signal(
            Arc::clone(self.store()),
            self.config().max_concurrent_tasks,
            CancelSignal::new(),
        );
        for (node, count) in &counts {
            self.resize_instances(&ctx, deployment, node, *count).await?;
        }
        ctx.flush().await?;
        debug!(deployment, resized = counts.len(), "instances backfilled");
        Ok(())
    }
}
