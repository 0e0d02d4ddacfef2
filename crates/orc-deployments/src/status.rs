//! Deployment status

use crate::deployments::Deployments;
use crate::error::Result;
use crate::keys;
use orc_store::KvStoreExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentStatus {
    /// Definition being stored
    Initial,
    /// Install workflow running
    DeploymentInProgress,
    /// Installed
    Deployed,
    /// Definition or install failed
    DeploymentFailed,
    /// Uninstalled
    Undeployed,
}

impl DeploymentStatus {
    /// Name as stored
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "INITIAL",
            Self::DeploymentInProgress => "DEPLOYMENT_IN_PROGRESS",
            Self::Deployed => "DEPLOYED",
            Self::DeploymentFailed => "DEPLOYMENT_FAILED",
            Self::Undeployed => "UNDEPLOYED",
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "INITIAL" => Ok(Self::Initial),
            "DEPLOYMENT_IN_PROGRESS" => Ok(Self::DeploymentInProgress),
            "DEPLOYED" => Ok(Self::Deployed),
            "DEPLOYMENT_FAILED" => Ok(Self::DeploymentFailed),
            "UNDEPLOYED" => Ok(Self::Undeployed),
            other => Err(format!("unknown deployment status {other:?}")),
        }
    }
}

impl Deployments {
    /// Store the status of `deployment`
    ///
    /// # Errors
    /// Returns store errors.
    pub async fn set_status(&self, deployment: &str, status: DeploymentStatus) -> Result<()> {
        self.store()
            .set_string(&keys::status(deployment), status.as_str())
            .await?;
        tracing::info!(deployment, %status, "deployment status changed");
        Ok(())
    }

    /// Status of `deployment`, `None` when unknown or unreadable
    ///
    /// # Errors
    /// Returns store errors.
    pub async fn status(&self, deployment: &str) -> Result<Option<DeploymentStatus>> {
        let stored = self.store().get_string(&keys::status(deployment)).await?;
        Ok(stored.and_then(|s| s.parse().ok()))
    }
}
