//! ORC SSH utilities - Pooled remote command execution
//!
//! - [`SessionPool`]: one cached connection per target, single-use sessions
//! - [`RemoteClient`]: commands, scp file copies and cancellable commands
//!   with bounded constant-backoff retries
//! - [`Connector`] / [`Connection`] / [`Session`]: transport seams
//!
//! # Example
//!
//! ```rust,ignore
//! use orc_sshutil::{RemoteClient, SessionPool, SshConfig};
//! use std::sync::Arc;
//!
//! let pool = Arc::new(SessionPool::new(connector));
//! let client = RemoteClient::new(pool, SshConfig::new("10.0.0.4", "centos"));
//! let kernel = client.run_command("uname -r").await?;
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod pool;
pub mod session;

// Re-exports
pub use client::{RemoteClient, KILL};
pub use config::SshConfig;
pub use error::{Result, SessionError};
pub use pool::{PoolStats, PooledSession, SessionPool};
pub use session::{CommandOutput, Connection, Connector, Session};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
