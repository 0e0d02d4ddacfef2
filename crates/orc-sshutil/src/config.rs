//! Remote target configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection and retry settings of one remote target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// Remote host
    pub host: String,
    /// Remote port
    pub port: u16,
    /// Login user
    pub user: String,
    /// Timeout of one attempt in milliseconds, 0 for none
    pub timeout_ms: u64,
    /// Constant delay between attempts in milliseconds
    pub retry_backoff_ms: u64,
    /// Attempts after the first one
    pub max_retries: u32,
}

impl SshConfig {
    /// Create configuration for `user@host` on port 22
    #[must_use]
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            ..Self::default()
        }
    }

    /// With port
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// With per-attempt timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With retry policy
    #[inline]
    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Pool key of the target
    #[must_use]
    pub fn target(&self) -> String {
        format!("{}@{}:{}", self.user, self.host, self.port)
    }

    /// Per-attempt timeout, if any
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Delay between attempts, never zero
    #[inline]
    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.max(1))
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 22,
            user: "root".to_string(),
            timeout_ms: 30_000,
            retry_backoff_ms: 1_000,
            max_retries: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_names_user_host_and_port() {
        let config = SshConfig::new("10.0.0.4", "centos").with_port(2222);
        assert_eq!(config.target(), "centos@10.0.0.4:2222");
    }

    #[test]
    fn zero_timeout_disables_it() {
        let config = SshConfig {
            timeout_ms: 0,
            retry_backoff_ms: 0,
            ..SshConfig::default()
        };
        assert_eq!(config.timeout(), None);
        assert_eq!(config.retry_backoff(), Duration::from_millis(1));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: SshConfig = toml::from_str("host = \"db\"\nmax_retries = 5").unwrap();
        assert_eq!(config.host, "db");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.port, 22);
    }
}
