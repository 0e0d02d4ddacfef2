//! Type Hierarchy Resolver
//!
//! Answers questions about the per-deployment type catalog:
//! - derivation (`is-a`) along the single-parent chain
//! - which type in a chain implements an operation
//! - the data type reachable by a nested attribute path
//!
//! Resolved chains are cached per (deployment, type) with `moka`, only while
//! an enhancement run of that deployment is in progress. Entries are dropped
//! when the run starts and ends; lookups outside a run read the store.

use crate::config::DeploymentsConfig;
use crate::error::{NotFoundError, Result};
use crate::keys;
use async_trait::async_trait;
use dashmap::DashMap;
use moka::future::Cache;
use orc_store::{KvStore, KvStoreExt};
use orc_tosca::value::{is_primitive, LIST_PREFIX, MAP_PREFIX};
use orc_tosca::{AttributeDefinition, PropertyDefinition, RequirementDefinition, TypeDef};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Cache key: (deployment, type)
type ChainKey = (String, String);

/// Resolves types of one store, for any deployment
#[derive(Clone)]
pub struct TypeResolver {
    store: Arc<dyn KvStore>,
    chains: Cache<ChainKey, Arc<Vec<String>>>,
    /// Enhancement runs in progress, per deployment
    runs: Arc<DashMap<String, usize>>,
}

impl std::fmt::Debug for TypeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeResolver")
            .field("cached_chains", &self.chains.entry_count())
            .field("active_runs", &self.runs.len())
            .finish_non_exhaustive()
    }
}

impl TypeResolver {
    /// Create resolver over `store`
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, config: &DeploymentsConfig) -> Self {
        let chains = Cache::builder()
            .max_capacity(config.type_cache_capacity)
            .time_to_live(config.type_cache_ttl())
            .support_invalidation_closures()
            .build();
        Self {
            store,
            chains,
            runs: Arc::new(DashMap::new()),
        }
    }

    /// Start caching chains of `deployment`
    pub fn begin_run(&self, deployment: &str) {
        self.invalidate_deployment(deployment);
        *self.runs.entry(deployment.to_string()).or_insert(0) += 1;
    }

    /// Stop caching chains of `deployment` once its last run ends
    pub fn end_run(&self, deployment: &str) {
        if let Some(mut runs) = self.runs.get_mut(deployment) {
            *runs = runs.saturating_sub(1);
        }
        self.runs.remove_if(deployment, |_, runs| *runs == 0);
        self.invalidate_deployment(deployment);
    }

    /// Fetch a type definition
    ///
    /// # Errors
    /// Returns [`NotFoundError::Type`] if the type is not in the catalog.
    pub async fn get_type(&self, deployment: &str, name: &str) -> Result<TypeDef> {
        self.store
            .get_json(&keys::type_def(deployment, name))
            .await?
            .ok_or_else(|| {
                NotFoundError::Type {
                    deployment: deployment.to_string(),
                    name: name.to_string(),
                }
                .into()
            })
    }

    /// Check whether a type is in the catalog
    ///
    /// # Errors
    /// Returns store errors.
    pub async fn type_exists(&self, deployment: &str, name: &str) -> Result<bool> {
        Ok(self.store.exists(&keys::type_def(deployment, name)).await?)
    }

    /// Every type name of the catalog
    ///
    /// # Errors
    /// Returns store errors.
    pub async fn type_names(&self, deployment: &str) -> Result<Vec<String>> {
        Ok(self.store.child_keys(&keys::types(deployment)).await?)
    }

    /// Derivation chain of `name`, most derived first
    ///
    /// # Errors
    /// Returns [`NotFoundError::Type`] if any type of the chain is missing.
    pub async fn chain(&self, deployment: &str, name: &str) -> Result<Arc<Vec<String>>> {
        let key = (deployment.to_string(), name.to_string());
        let cached = self.runs.contains_key(deployment);
        if cached {
            if let Some(chain) = self.chains.get(&key).await {
                return Ok(chain);
            }
        }

        let mut chain = Vec::new();
        let mut current = Some(name.to_string());
        while let Some(type_name) = current {
            if chain.contains(&type_name) {
                tracing::warn!(deployment, type_name = %type_name, "derivation cycle, chain cut");
                break;
            }
            let def = self.get_type(deployment, &type_name).await?;
            chain.push(type_name);
            current = def.derived_from;
        }

        let chain = Arc::new(chain);
        if cached {
            self.chains.insert(key, Arc::clone(&chain)).await;
        }
        Ok(chain)
    }

    /// Check whether `name` is, or derives from, `ancestor`
    ///
    /// # Errors
    /// Returns [`NotFoundError::Type`] if a type of the chain is missing.
    pub async fn is_derived_from(&self, deployment: &str, name: &str, ancestor: &str) -> Result<bool> {
        if name == ancestor {
            return Ok(true);
        }
        Ok(self.chain(deployment, name).await?.iter().any(|t| t == ancestor))
    }

    /// First type of the chain declaring `interface.operation`
    ///
    /// `None` means no type implements it; callers skip silently.
    ///
    /// # Errors
    /// Returns [`NotFoundError::Type`] if a type of the chain is missing.
    pub async fn type_implementing_operation(
        &self,
        deployment: &str,
        name: &str,
        operation: &str,
    ) -> Result<Option<String>> {
        let Some((interface, operation)) = operation.rsplit_once('.') else {
            return Ok(None);
        };
        for type_name in self.chain(deployment, name).await?.iter() {
            let def = self.get_type(deployment, type_name).await?;
            if def.has_operation(interface, operation) {
                return Ok(Some(type_name.clone()));
            }
        }
        Ok(None)
    }

    /// Attribute definition of `attribute`, looked up along the chain
    ///
    /// # Errors
    /// Returns [`NotFoundError::Type`] if a type of the chain is missing.
    pub async fn attribute_definition(
        &self,
        deployment: &str,
        name: &str,
        attribute: &str,
    ) -> Result<Option<AttributeDefinition>> {
        for type_name in self.chain(deployment, name).await?.iter() {
            let mut def = self.get_type(deployment, type_name).await?;
            if let Some(attr) = def.attributes.remove(attribute) {
                return Ok(Some(attr));
            }
        }
        Ok(None)
    }

    /// Property definition of `property`, looked up along the chain
    ///
    /// # Errors
    /// Returns [`NotFoundError::Type`] if a type of the chain is missing.
    pub async fn property_definition(
        &self,
        deployment: &str,
        name: &str,
        property: &str,
    ) -> Result<Option<PropertyDefinition>> {
        for type_name in self.chain(deployment, name).await?.iter() {
            let mut def = self.get_type(deployment, type_name).await?;
            if let Some(prop) = def.properties.remove(property) {
                return Ok(Some(prop));
            }
        }
        Ok(None)
    }

    /// Requirement definition named `requirement`, looked up along the chain
    ///
    /// # Errors
    /// Returns [`NotFoundError::Type`] if a type of the chain is missing.
    pub async fn requirement_definition(
        &self,
        deployment: &str,
        name: &str,
        requirement: &str,
    ) -> Result<Option<RequirementDefinition>> {
        for type_name in self.chain(deployment, name).await?.iter() {
            let def = self.get_type(deployment, type_name).await?;
            if let Some(req) = def.requirements.into_iter().find(|r| r.name == requirement) {
                return Ok(Some(req.value));
            }
        }
        Ok(None)
    }

    /// Every attribute name declared along the chain, sorted
    ///
    /// # Errors
    /// Returns [`NotFoundError::Type`] if a type of the chain is missing.
    pub async fn attribute_names(&self, deployment: &str, name: &str) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for type_name in self.chain(deployment, name).await?.iter() {
            let def = self.get_type(deployment, type_name).await?;
            names.extend(def.attributes.into_keys());
        }
        Ok(names)
    }

    /// Capability type of capability `capability` of node type `name`
    ///
    /// # Errors
    /// Returns [`NotFoundError::Type`] if a type of the chain is missing.
    pub async fn capability_type(
        &self,
        deployment: &str,
        name: &str,
        capability: &str,
    ) -> Result<Option<String>> {
        for type_name in self.chain(deployment, name).await?.iter() {
            let mut def = self.get_type(deployment, type_name).await?;
            if let Some(cap) = def.capabilities.remove(capability) {
                return Ok(Some(cap.type_name));
            }
        }
        Ok(None)
    }

    /// Schema type of attribute `attribute` of type `name`
    ///
    /// `list`/`map` with an entry schema become `list:<entry>`/`map:<entry>`.
    ///
    /// # Errors
    /// Returns [`NotFoundError::Attribute`] if no type of the chain declares it.
    pub async fn attribute_data_type(&self, deployment: &str, name: &str, attribute: &str) -> Result<String> {
        match self.attribute_definition(deployment, name, attribute).await? {
            Some(def) => Ok(def.data_type()),
            None => Err(NotFoundError::Attribute {
                type_name: name.to_string(),
                attribute: attribute.to_string(),
            }
            .into()),
        }
    }

    /// Data type reached by following `path` from `base`
    ///
    /// A `list:`/`map:` prefix is stripped for one segment; a complex data
    /// type resolves the segment as one of its properties. `None` means the
    /// path is not representable in the schema.
    ///
    /// # Errors
    /// Returns [`NotFoundError::Type`] if a complex data type is missing.
    pub async fn nested_data_type(&self, deployment: &str, base: &str, path: &[String]) -> Result<Option<String>> {
        let mut current = base.to_string();
        for segment in path {
            if let Some(entry) = current
                .strip_prefix(LIST_PREFIX)
                .or_else(|| current.strip_prefix(MAP_PREFIX))
            {
                current = entry.to_string();
                continue;
            }
            if current == "list" || current == "map" || is_primitive(&current) {
                return Ok(None);
            }
            match self.property_definition(deployment, &current, segment).await? {
                Some(def) => current = def.data_type(),
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// File extensions declared by an artifact type
    ///
    /// # Errors
    /// Returns [`NotFoundError::Type`] if the type is missing.
    pub async fn artifact_type_extensions(&self, deployment: &str, name: &str) -> Result<Vec<String>> {
        Ok(self.get_type(deployment, name).await?.file_ext)
    }

    /// Drop every cached chain of `deployment`
    pub fn invalidate_deployment(&self, deployment: &str) {
        let deployment = deployment.to_string();
        if let Err(err) = self
            .chains
            .invalidate_entries_if(move |(dep, _), _| *dep == deployment)
        {
            tracing::warn!(error = %err, "failed to invalidate type chains");
        }
    }

    /// Bind to one deployment for nested type lookups
    #[must_use]
    pub fn for_deployment<'a>(&'a self, deployment: &'a str) -> DeploymentTypes<'a> {
        DeploymentTypes {
            resolver: self,
            deployment,
        }
    }
}

/// Schema lookup used to build nested attribute values
#[async_trait]
pub trait NestedTypeLookup: Send + Sync {
    /// Data type reached by following `path` from `base`, if representable
    async fn nested_type(&self, base: &str, path: &[String]) -> Result<Option<String>>;
}

/// [`TypeResolver`] bound to one deployment
#[derive(Debug, Clone, Copy)]
pub struct DeploymentTypes<'a> {
    resolver: &'a TypeResolver,
    deployment: &'a str,
}

#[async_trait]
impl NestedTypeLookup for DeploymentTypes<'_> {
    async fn nested_type(&self, base: &str, path: &[String]) -> Result<Option<String>> {
        self.resolver.nested_data_type(self.deployment, base, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orc_store::MemoryStore;
    use orc_tosca::{OperationDefinition, TypeKind};

    async fn resolver_with(types: Vec<(&str, TypeDef)>) -> TypeResolver {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        for (name, def) in types {
            store.set_json(&keys::type_def("d", name), &def).await.unwrap();
        }
        TypeResolver::new(store, &DeploymentsConfig::default())
    }

    fn node(parent: Option<&str>) -> TypeDef {
        let def = TypeDef::new(TypeKind::Node);
        match parent {
            Some(p) => def.derived_from(p),
            None => def,
        }
    }

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn derivation_walks_chain() {
        let r = resolver_with(vec![
            ("Root", node(None)),
            ("Compute", node(Some("Root"))),
            ("MyCompute", node(Some("Compute"))),
        ])
        .await;

        assert!(r.is_derived_from("d", "MyCompute", "Root").await.unwrap());
        assert!(r.is_derived_from("d", "Compute", "Compute").await.unwrap());
        assert!(!r.is_derived_from("d", "Compute", "MyCompute").await.unwrap());
        assert_eq!(
            r.chain("d", "MyCompute").await.unwrap().as_slice(),
            ["MyCompute", "Compute", "Root"]
        );
    }

    #[tokio::test]
    async fn missing_parent_is_not_found() {
        let r = resolver_with(vec![("Orphan", node(Some("Ghost")))]).await;
        let err = r.is_derived_from("d", "Orphan", "Root").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn implementing_type_is_most_derived() {
        let r = resolver_with(vec![
            ("Root", node(None).with_operation("Standard", "create", OperationDefinition::default())),
            ("Web", node(Some("Root")).with_operation("Standard", "start", OperationDefinition::default())),
        ])
        .await;

        assert_eq!(
            r.type_implementing_operation("d", "Web", "Standard.start").await.unwrap().as_deref(),
            Some("Web")
        );
        assert_eq!(
            r.type_implementing_operation("d", "Web", "Standard.create").await.unwrap().as_deref(),
            Some("Root")
        );
        assert_eq!(r.type_implementing_operation("d", "Web", "Standard.stop").await.unwrap(), None);
    }

    #[tokio::test]
    async fn nested_data_type_follows_schema() {
        let info = TypeDef::new(TypeKind::Data)
            .with_property("addresses", AttributeDefinition::of_type("list").with_entry_schema("string"))
            .with_property("name", AttributeDefinition::of_type("string"));
        let r = resolver_with(vec![("NetInfo", info)]).await;
        let base = "map:NetInfo";

        let lookup = |p: &'static [&'static str]| {
            let r = r.clone();
            async move { r.nested_data_type("d", base, &path(p)).await.unwrap() }
        };
        assert_eq!(lookup(&["priv"]).await.as_deref(), Some("NetInfo"));
        assert_eq!(lookup(&["priv", "addresses"]).await.as_deref(), Some("list:string"));
        assert_eq!(lookup(&["priv", "addresses", "0"]).await.as_deref(), Some("string"));
        assert_eq!(lookup(&["priv", "unknown"]).await, None);
        assert_eq!(lookup(&["priv", "name", "x"]).await, None);
    }

    #[tokio::test]
    async fn invalidation_is_per_deployment() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        for dep in ["a", "b"] {
            store.set_json(&keys::type_def(dep, "Root"), &node(None)).await.unwrap();
            store.set_json(&keys::type_def(dep, "T"), &node(Some("Root"))).await.unwrap();
        }
        let r = TypeResolver::new(Arc::clone(&store), &DeploymentsConfig::default());
        r.begin_run("a");
        r.begin_run("b");
        r.chain("a", "T").await.unwrap();
        r.chain("b", "T").await.unwrap();

        // Re-parent T in both deployments behind the cache's back
        for dep in ["a", "b"] {
            store.set_json(&keys::type_def(dep, "T"), &node(None)).await.unwrap();
        }
        r.invalidate_deployment("a");

        assert_eq!(r.chain("a", "T").await.unwrap().len(), 1);
        assert_eq!(r.chain("b", "T").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn chains_are_cached_only_during_a_run() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        store.set_json(&keys::type_def("d", "Root"), &node(None)).await.unwrap();
        store.set_json(&keys::type_def("d", "T"), &node(Some("Root"))).await.unwrap();
        let r = TypeResolver::new(Arc::clone(&store), &DeploymentsConfig::default());

        // Outside a run every lookup reads the store
        assert_eq!(r.chain("d", "T").await.unwrap().len(), 2);
        store.set_json(&keys::type_def("d", "T"), &node(None)).await.unwrap();
        assert_eq!(r.chain("d", "T").await.unwrap().len(), 1);

        r.begin_run("d");
        assert_eq!(r.chain("d", "T").await.unwrap().len(), 1);
        store.set_json(&keys::type_def("d", "T"), &node(Some("Root"))).await.unwrap();
        assert_eq!(r.chain("d", "T").await.unwrap().len(), 1);
        r.end_run("d");

        assert_eq!(r.chain("d", "T").await.unwrap().len(), 2);
    }
}
