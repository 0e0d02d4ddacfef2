//! Topology documents

use crate::error::ToscaError;
use crate::template::NodeTemplate;
use crate::types::{TypeDef, TypeKind};
use crate::workflow::Workflow;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parsed topology document
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Topology {
    /// Definitions version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tosca_definitions_version: Option<String>,
    /// Free text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Node types
    #[serde(default)]
    pub node_types: BTreeMap<String, TypeDef>,
    /// Relationship types
    #[serde(default)]
    pub relationship_types: BTreeMap<String, TypeDef>,
    /// Capability types
    #[serde(default)]
    pub capability_types: BTreeMap<String, TypeDef>,
    /// Data types
    #[serde(default)]
    pub data_types: BTreeMap<String, TypeDef>,
    /// Artifact types
    #[serde(default)]
    pub artifact_types: BTreeMap<String, TypeDef>,
    /// Templates
    #[serde(default)]
    pub topology_template: TopologyTemplate,
}

/// Node templates and workflows of a topology
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopologyTemplate {
    /// Node templates in document order
    #[serde(default)]
    pub node_templates: IndexMap<String, NodeTemplate>,
    /// Workflows
    #[serde(default)]
    pub workflows: BTreeMap<String, Workflow>,
}

impl Topology {
    /// Parse a YAML document
    ///
    /// # Errors
    /// Returns [`ToscaError::Parse`] if the document is not a valid topology.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ToscaError> {
        serde_yaml::from_str(yaml).map_err(ToscaError::Parse)
    }

    /// Every declared type with its kind set from the section it came from
    #[must_use]
    pub fn types(&self) -> Vec<(String, TypeDef)> {
        let sections = [
            (TypeKind::Node, &self.node_types),
            (TypeKind::Relationship, &self.relationship_types),
            (TypeKind::Capability, &self.capability_types),
            (TypeKind::Data, &self.data_types),
            (TypeKind::Artifact, &self.artifact_types),
        ];
        sections
            .into_iter()
            .flat_map(|(kind, section)| {
                section.iter().map(move |(name, def)| {
                    let mut def = def.clone();
                    def.kind = kind;
                    (name.clone(), def)
                })
            })
            .collect()
    }

    /// Node templates in document order
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &IndexMap<String, NodeTemplate> {
        &self.topology_template.node_templates
    }

    /// Workflows
    #[inline]
    #[must_use]
    pub fn workflows(&self) -> &BTreeMap<String, Workflow> {
        &self.topology_template.workflows
    }
}
