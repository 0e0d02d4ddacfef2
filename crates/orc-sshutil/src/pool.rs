//! Session pool
//!
//! One cached connection per `user@host:port` target:
//! - sessions are opened on the cached connection, one per command
//! - a connection reported closed, or failing to open a session, is evicted
//!   and re-established on next use

use crate::config::SshConfig;
use crate::error::Result;
use crate::session::{Connection, Connector};
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Session of the connections of connector `C`
pub type PooledSession<C> = <<C as Connector>::Connection as Connection>::Session;

/// Pool statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Connections established
    pub connects: usize,
    /// Connections dropped after a failure
    pub evictions: usize,
    /// Connections currently cached
    pub cached: usize,
}

/// Connection cache shared by remote clients
pub struct SessionPool<C: Connector> {
    connector: C,
    connections: DashMap<String, Arc<C::Connection>>,
    connects: AtomicUsize,
    evictions: AtomicUsize,
}

impl<C: Connector> SessionPool<C> {
    /// Create pool over `connector`
    #[must_use]
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            connections: DashMap::new(),
            connects: AtomicUsize::new(0),
            evictions: AtomicUsize::new(0),
        }
    }

    /// Open a session to the target of `config`
    ///
    /// # Errors
    /// Returns connection errors; the connection is evicted when it broke.
    pub async fn open_session(&self, config: &SshConfig) -> Result<PooledSession<C>> {
        let target = config.target();
        let connection = self.connection(config, &target).await?;
        match connection.open_session().await {
            Ok(session) => Ok(session),
            Err(err) => {
                if err.breaks_connection() {
                    self.evict(&target);
                }
                Err(err)
            }
        }
    }

    async fn connection(&self, config: &SshConfig, target: &str) -> Result<Arc<C::Connection>> {
        let cached = self.connections.get(target).map(|c| Arc::clone(c.value()));
        if let Some(connection) = cached {
            if !connection.is_closed() {
                return Ok(connection);
            }
            self.evict(target);
        }

        tracing::debug!(target = %target, "connecting");
        let connection = Arc::new(self.connector.connect(config).await?);
        self.connects.fetch_add(1, Ordering::Relaxed);

        // A concurrent caller may have connected first
        let entry = self
            .connections
            .entry(target.to_string())
            .or_insert_with(|| connection);
        Ok(Arc::clone(entry.value()))
    }

    /// Drop the cached connection of `target`
    ///
    /// Returns `true` if one was cached.
    pub fn evict(&self, target: &str) -> bool {
        let evicted = self.connections.remove(target).is_some();
        if evicted {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(target = %target, "connection evicted");
        }
        evicted
    }

    /// Pool statistics
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            connects: self.connects.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            cached: self.connections.len(),
        }
    }
}

impl<C: Connector> fmt::Debug for SessionPool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionPool")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
