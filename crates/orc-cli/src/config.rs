//! CLI configuration file

use anyhow::{Context, Result};
use orc_deployments::DeploymentsConfig;
use orc_sshutil::SshConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directives used when `RUST_LOG` is unset
    pub filter: String,
    /// Emit JSON lines instead of text
    pub json: bool,
}

impl LogConfig {
    /// With filter directives
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// With JSON output
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

/// Contents of `orc.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrcConfig {
    /// Pipeline settings
    pub deployments: DeploymentsConfig,
    /// Remote execution defaults
    pub ssh: SshConfig,
    /// Logging
    pub log: LogConfig,
}

impl OrcConfig {
    /// Read `path`, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }
}
