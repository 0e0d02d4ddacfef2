//! Transport seams
//!
//! A [`Connector`] opens long-lived [`Connection`]s to a target; each
//! command runs in its own single-use [`Session`]. The wire protocol lives
//! behind these traits.

use crate::config::SshConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Result of a command that ran to completion
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit status
    pub status: u32,
    /// Combined stdout and stderr
    pub output: Vec<u8>,
}

impl CommandOutput {
    /// Successful output
    #[must_use]
    pub fn success(output: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 0,
            output: output.into(),
        }
    }

    /// Output as text, without NUL padding
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).trim_matches('\0').to_string()
    }
}

/// Channel running one command
#[async_trait]
pub trait Session: Send + Sync {
    /// Run `command` with `stdin` as standard input
    ///
    /// A command that exits non-zero is reported in the output, not as an
    /// error.
    async fn exec(&self, command: &str, stdin: Vec<u8>) -> Result<CommandOutput>;

    /// Deliver a signal such as `KILL` to the running command
    async fn signal(&self, signal: &str) -> Result<()>;

    /// Close the channel
    async fn close(&self) -> Result<()>;
}

/// Authenticated connection to one target
#[async_trait]
pub trait Connection: Send + Sync {
    /// Session type
    type Session: Session + 'static;

    /// Open a new session
    async fn open_session(&self) -> Result<Self::Session>;

    /// Check whether the connection is known to be unusable
    fn is_closed(&self) -> bool;
}

/// Connection factory
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connection type
    type Connection: Connection + 'static;

    /// Connect and authenticate to the target of `config`
    async fn connect(&self, config: &SshConfig) -> Result<Self::Connection>;
}
