//! Node templates and requirement assignments

use crate::function::ValueAssignment;
use crate::named::Named;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Directive marking a node satisfied by an external resource
pub const SUBSTITUTABLE_DIRECTIVE: &str = "substitutable";

/// Requirement assignment of a node template
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RequirementRepr")]
pub struct RequirementAssignment {
    /// Target node name
    pub node: String,
    /// Target capability type
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub capability: String,
    /// Relationship type
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub relationship: String,
    /// Relationship properties
    #[serde(rename = "properties", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationship_props: BTreeMap<String, ValueAssignment>,
}

impl RequirementAssignment {
    /// Create assignment targeting `node`
    #[must_use]
    pub fn to_node(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            ..Self::default()
        }
    }

    /// Set capability type
    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capability = capability.into();
        self
    }

    /// Set relationship type
    #[must_use]
    pub fn with_relationship(mut self, relationship: impl Into<String>) -> Self {
        self.relationship = relationship.into();
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RequirementRepr {
    Short(String),
    Full {
        node: String,
        #[serde(default)]
        capability: String,
        #[serde(default)]
        relationship: String,
        #[serde(default)]
        properties: BTreeMap<String, ValueAssignment>,
    },
}

impl From<RequirementRepr> for RequirementAssignment {
    fn from(repr: RequirementRepr) -> Self {
        match repr {
            RequirementRepr::Short(node) => Self::to_node(node),
            RequirementRepr::Full {
                node,
                capability,
                relationship,
                properties,
            } => Self {
                node,
                capability,
                relationship,
                relationship_props: properties,
            },
        }
    }
}

/// Property and attribute assignments of one capability
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapabilityAssignment {
    /// Property assignments
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, ValueAssignment>,
    /// Attribute assignments
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, ValueAssignment>,
}

/// Node template
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeTemplate {
    /// Node type name
    #[serde(rename = "type")]
    pub type_name: String,
    /// Processing directives
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<String>,
    /// Property assignments
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, ValueAssignment>,
    /// Attribute assignments
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, ValueAssignment>,
    /// Capability assignments
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub capabilities: BTreeMap<String, CapabilityAssignment>,
    /// Ordered requirement assignments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<Named<RequirementAssignment>>,
}

impl NodeTemplate {
    /// Create template of `type_name`
    #[must_use]
    pub fn of_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    /// Check whether the node is substitution-mapped
    #[inline]
    #[must_use]
    pub fn is_substitutable(&self) -> bool {
        self.directives.iter().any(|d| d == SUBSTITUTABLE_DIRECTIVE)
    }

    /// Requirement assignments named `name`, with their index
    pub fn requirements_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = (usize, &'a RequirementAssignment)> + 'a {
        self.requirements
            .iter()
            .enumerate()
            .filter(move |(_, r)| r.name == name)
            .map(|(i, r)| (i, &r.value))
    }

    /// Capability property assignment
    #[must_use]
    pub fn capability_property(&self, capability: &str, property: &str) -> Option<&ValueAssignment> {
        self.capabilities
            .get(capability)
            .and_then(|c| c.properties.get(property))
    }
}
