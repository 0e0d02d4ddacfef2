//! Storing a deployment definition
//!
//! `store_deployment_definition` is the end-to-end entry point: persist the
//! topology, register implementation artifact extensions, then enhance.
//! Any failure is terminal: the deployment is marked failed and no partial
//! repair is attempted.

use crate::deployments::Deployments;
use crate::error::{DeploymentError, Result};
use crate::keys;
use crate::status::DeploymentStatus;
use orc_events::LogLevel;
use orc_store::{KvStoreExt, StoreContext};
use orc_tosca::normative::{builtin_types, IMPLEMENTATION_ARTIFACT};
use orc_tosca::Topology;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name reported when the built-in catalog fails to load
const BUILTIN_CATALOG: &str = "normative_types.yaml";

impl Deployments {
    /// Store and enhance the topology found at `source`
    ///
    /// The status is `INITIAL` while storing and `DEPLOYMENT_FAILED` if
    /// anything went wrong.
    ///
    /// # Errors
    /// Returns the first error of loading, storing or enhancing.
    pub async fn store_deployment_definition(&self, deployment: &str, source: &Path) -> Result<()> {
        self.set_status(deployment, DeploymentStatus::Initial).await?;

        let result = self.store_and_enhance(deployment, source).await;
        if let Err(err) = &result {
            tracing::error!(deployment, error = %err, "failed to store deployment definition");
            self.events().simple(
                LogLevel::Error,
                deployment,
                &format!("Failed to store deployment definition: {err}"),
            );
            if let Err(status_err) = self.set_status(deployment, DeploymentStatus::DeploymentFailed).await {
                tracing::warn!(deployment, error = %status_err, "failed to mark deployment as failed");
            }
        }
        result
    }

    async fn store_and_enhance(&self, deployment: &str, source: &Path) -> Result<()> {
        let topology = self.topology_provider().load(source).await?;
        self.store_topology(deployment, &topology).await?;
        self.register_implementation_types(deployment).await?;
        self.enhance_nodes(deployment).await
    }

    /// Replace the stored topology of `deployment`
    ///
    /// Built-in types are written first so that topology types override them.
    ///
    /// # Errors
    /// Returns store and encoding errors.
    pub async fn store_topology(&self, deployment: &str, topology: &Topology) -> Result<()> {
        let builtin = builtin_types().map_err(|source| DeploymentError::Topology {
            path: PathBuf::from(BUILTIN_CATALOG),
            source,
        })?;

        self.store().delete_tree(&keys::topology(deployment)).await?;

        let ctx = StoreContext::new(Arc::clone(self.store()));
        let mut types = BTreeMap::new();
        types.extend(builtin);
        types.extend(topology.types());
        for (name, def) in &types {
            ctx.set_json(keys::type_def(deployment, name), def)?;
        }
        for (name, template) in topology.nodes() {
            ctx.set_json(keys::node(deployment, name), template)?;
        }
        for (name, workflow) in topology.workflows() {
            ctx.set_json(keys::workflow(deployment, name), workflow)?;
        }
        ctx.flush().await?;

        tracing::info!(
            deployment,
            types = types.len(),
            nodes = topology.nodes().len(),
            workflows = topology.workflows().len(),
            "topology stored"
        );
        Ok(())
    }

    /// Map file extensions to the implementation artifact types declaring them
    ///
    /// Types whose hierarchy is incomplete are reported and skipped.
    ///
    /// # Errors
    /// Returns store errors.
    pub async fn register_implementation_types(&self, deployment: &str) -> Result<()> {
        let mut extensions = BTreeMap::new();
        for type_name in self.types().type_names(deployment).await? {
            match self
                .types()
                .is_derived_from(deployment, &type_name, IMPLEMENTATION_ARTIFACT)
                .await
            {
                Ok(true) => {
                    for ext in self.types().artifact_type_extensions(deployment, &type_name).await? {
                        extensions.insert(ext.to_lowercase(), type_name.clone());
                    }
                }
                Ok(false) => {}
                Err(err) if err.is_not_found() => {
                    tracing::warn!(deployment, type_name = %type_name, error = %err, "type skipped");
                    self.events()
                        .simple(LogLevel::Warn, deployment, &format!("[WARNING] {err}"));
                }
                Err(err) => return Err(err),
            }
        }

        if !extensions.is_empty() {
            self.store()
                .set_json(&keys::implementation_extensions(deployment), &extensions)
                .await?;
        }
        tracing::debug!(deployment, extensions = extensions.len(), "implementation types registered");
        Ok(())
    }

    /// Implementation artifact type handling files with extension `ext`
    ///
    /// # Errors
    /// Returns store errors.
    pub async fn implementation_artifact(&self, deployment: &str, ext: &str) -> Result<Option<String>> {
        let extensions: Option<BTreeMap<String, String>> = self
            .store()
            .get_json(&keys::implementation_extensions(deployment))
            .await?;
        Ok(extensions.and_then(|mut map| map.remove(&ext.to_lowercase())))
    }
}
