//! Remote command client
//!
//! Every operation runs in a fresh session of the shared pool and is retried
//! with a constant backoff. Each attempt is bounded by the configured
//! timeout. A command that ran and exited non-zero is returned at once.

use crate::config::SshConfig;
use crate::error::{Result, SessionError};
use crate::pool::SessionPool;
use crate::session::{CommandOutput, Connector, Session};
use orc_tasks::CancelSignal;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Signal sent to a cancelled remote command
pub const KILL: &str = "KILL";

/// Client of one remote target
#[derive(Debug)]
pub struct RemoteClient<C: Connector> {
    pool: Arc<SessionPool<C>>,
    config: SshConfig,
}

impl<C: Connector> Clone for RemoteClient<C> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            config: self.config.clone(),
        }
    }
}

impl<C: Connector> RemoteClient<C> {
    /// Create client of the target of `config`
    #[must_use]
    pub fn new(pool: Arc<SessionPool<C>>, config: SshConfig) -> Self {
        Self { pool, config }
    }

    /// Target configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// Run `command` and return its combined output
    ///
    /// # Errors
    /// Returns [`SessionError::Exit`] if the command failed, or the last
    /// transport error once retries are exhausted.
    pub async fn run_command(&self, command: &str) -> Result<String> {
        self.retry(|| self.run_once(command, Vec::new())).await
    }

    /// Copy `content` to `remote_path` with mode `permissions` (e.g. `0755`)
    ///
    /// The parent directory is created first.
    ///
    /// # Errors
    /// Returns [`SessionError::Transfer`] if the directory cannot be
    /// created, and the errors of [`Self::run_command`].
    pub async fn copy_file(&self, content: &[u8], remote_path: &str, permissions: &str) -> Result<()> {
        let (directory, name) = match remote_path.rsplit_once('/') {
            Some(("", name)) => ("/", name),
            Some((directory, name)) => (directory, name),
            None => (".", remote_path),
        };

        self.run_command(&format!("mkdir -p {directory}"))
            .await
            .map_err(|err| SessionError::Transfer {
                path: remote_path.to_string(),
                message: format!("couldn't create the remote directory {directory:?}: {err}"),
            })?;

        let mut payload = format!("C{permissions} {} {name}\n", content.len()).into_bytes();
        payload.extend_from_slice(content);
        payload.push(0);

        let sink = format!("scp -qt {directory}");
        self.retry(|| self.run_once(&sink, payload.clone())).await?;
        debug!(target = %self.config.target(), path = remote_path, size = content.len(), "file copied");
        Ok(())
    }

    /// Run `command` until it completes or `cancel` fires
    ///
    /// On cancellation the remote process is killed and the session closed.
    /// Only opening the session is retried.
    ///
    /// # Errors
    /// Returns [`SessionError::Cancelled`] when cancelled, and the errors of
    /// [`Self::run_command`].
    pub async fn run_cancellable(&self, command: &str, cancel: &CancelSignal) -> Result<String> {
        let session = self.retry(|| self.pool.open_session(&self.config)).await?;
        debug!(target = %self.config.target(), command, "running cancellable command");

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(target = %self.config.target(), "cancelled, killing remote process");
                if let Err(err) = session.signal(KILL).await {
                    warn!(error = %err, "failed to signal remote process");
                }
                close(&session).await;
                Err(SessionError::Cancelled)
            }
            result = session.exec(command, Vec::new()) => {
                close(&session).await;
                self.completed(result)
            }
        }
    }

    async fn run_once(&self, command: &str, stdin: Vec<u8>) -> Result<String> {
        let session = self.pool.open_session(&self.config).await?;
        debug!(target = %self.config.target(), command, "running command");
        let result = session.exec(command, stdin).await;
        close(&session).await;
        self.completed(result)
    }

    fn completed(&self, result: Result<CommandOutput>) -> Result<String> {
        let output = result.map_err(|err| {
            if err.breaks_connection() {
                self.pool.evict(&self.config.target());
            }
            err
        })?;
        let text = output.text();
        debug!(status = output.status, output = %text, "command completed");
        if output.status != 0 {
            return Err(SessionError::Exit {
                status: output.status,
                output: text,
            });
        }
        Ok(text)
    }

    async fn retry<T, F, Fut>(&self, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retries = 0;
        loop {
            let outcome = match self.config.timeout() {
                Some(limit) => tokio::time::timeout(limit, attempt())
                    .await
                    .unwrap_or(Err(SessionError::Timeout {
                        duration_ms: self.config.timeout_ms,
                    })),
                None => attempt().await,
            };
            match outcome {
                Err(err) if err.is_retryable() && retries < self.config.max_retries => {
                    retries += 1;
                    warn!(target = %self.config.target(), retries, error = %err, "attempt failed, retrying");
                    tokio::time::sleep(self.config.retry_backoff()).await;
                }
                other => return other,
            }
        }
    }
}

async fn close<S: Session>(session: &S) {
    if let Err(err) = session.close().await {
        debug!(error = %err, "failed to close session");
    }
}
