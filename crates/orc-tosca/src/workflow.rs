//! Workflows: named steps chained by `on_success`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Step activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    /// Move the node instances to a state
    SetState(String),
    /// Hand the node over to its provisioning driver
    Delegate(String),
    /// Run `interface.operation`
    CallOperation(String),
}

/// Workflow step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Node the step acts on
    pub node: String,
    /// What the step does
    pub activity: Activity,
    /// Steps to run once this one succeeded
    #[serde(default, alias = "on-success", skip_serializing_if = "Vec::is_empty")]
    pub on_success: Vec<String>,
}

/// Workflow
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Workflow {
    /// Steps keyed by name
    #[serde(default)]
    pub steps: BTreeMap<String, Step>,
}
