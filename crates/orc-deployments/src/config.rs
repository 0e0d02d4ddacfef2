//! Deployments configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Deployments configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentsConfig {
    /// Maximum concurrent per-node tasks in a phase
    pub max_concurrent_tasks: usize,
    /// Maximum cached type chains
    pub type_cache_capacity: u64,
    /// Time to live of a cached type chain, in seconds
    pub type_cache_ttl_secs: u64,
}

impl DeploymentsConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With max concurrent tasks
    #[inline]
    #[must_use]
    pub fn with_max_concurrent_tasks(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = max;
        self
    }

    /// With type cache capacity
    #[inline]
    #[must_use]
    pub fn with_type_cache_capacity(mut self, capacity: u64) -> Self {
        self.type_cache_capacity = capacity;
        self
    }

    /// With type cache time to live
    #[inline]
    #[must_use]
    pub fn with_type_cache_ttl(mut self, ttl: Duration) -> Self {
        self.type_cache_ttl_secs = ttl.as_secs();
        self
    }

    /// Type cache time to live
    #[inline]
    #[must_use]
    pub fn type_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.type_cache_ttl_secs)
    }
}

impl Default for DeploymentsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: orc_tasks::DEFAULT_LIMIT,
            type_cache_capacity: 10_000,
            type_cache_ttl_secs: 600,
        }
    }
}
