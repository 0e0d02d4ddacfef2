//! Error types for remote execution

/// Remote session errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Connection or session could not be established
    #[error("connection to {target} failed: {message}")]
    Connection {
        /// `user@host:port`
        target: String,
        /// Cause
        message: String,
    },

    /// Remote command ran and exited with a non-zero status
    #[error("command exited with status {status}: {output}")]
    Exit {
        /// Exit status
        status: u32,
        /// Combined stdout and stderr
        output: String,
    },

    /// Attempt exceeded its timeout
    #[error("operation timed out after {duration_ms}ms")]
    Timeout {
        /// Timeout of the attempt
        duration_ms: u64,
    },

    /// Command was cancelled by the caller
    #[error("operation cancelled")]
    Cancelled,

    /// Connection dropped while in use
    #[error("connection closed: {0}")]
    Closed(String),

    /// File content could not be written to the remote side
    #[error("transfer to {path} failed: {message}")]
    Transfer {
        /// Remote path
        path: String,
        /// Cause
        message: String,
    },
}

impl SessionError {
    /// Check if another attempt may succeed
    ///
    /// A command that ran and failed is never retried.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Timeout { .. } | Self::Closed(_)
        )
    }

    /// Check if the pooled connection must be dropped
    #[inline]
    #[must_use]
    pub fn breaks_connection(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Closed(_))
    }

    /// Create a connection error
    #[inline]
    pub fn connection(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            target: target.into(),
            message: message.into(),
        }
    }
}

/// Result type for remote execution
pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_is_never_retried() {
        let exit = SessionError::Exit {
            status: 1,
            output: "no such file".into(),
        };
        assert!(!exit.is_retryable());
        assert!(!SessionError::Cancelled.is_retryable());
        assert!(SessionError::connection("root@h:22", "refused").is_retryable());
        assert!(SessionError::Timeout { duration_ms: 10 }.is_retryable());
    }

    #[test]
    fn only_transport_failures_break_connection() {
        assert!(SessionError::Closed("eof".into()).breaks_connection());
        assert!(!SessionError::Timeout { duration_ms: 10 }.breaks_connection());
    }
}
