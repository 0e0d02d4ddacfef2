//! Type definitions
//!
//! A single [`TypeDef`] shape covers node, relationship, capability, data and
//! artifact types; [`TypeKind`] tells them apart. Sections a kind does not use
//! stay empty and are omitted when serialized.

use crate::function::ValueAssignment;
use crate::named::Named;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// Node type
    #[default]
    Node,
    /// Relationship type
    Relationship,
    /// Capability type
    Capability,
    /// Data type
    Data,
    /// Artifact type
    Artifact,
}

/// Entry schema of a `list` or `map` definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySchema {
    /// Entry type name
    #[serde(rename = "type")]
    pub type_name: String,
}

/// Attribute or property definition
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Declared type name
    #[serde(rename = "type", default = "default_attribute_type")]
    pub type_name: String,
    /// Entry schema for `list` and `map`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_schema: Option<EntrySchema>,
    /// Default value assignment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ValueAssignment>,
    /// Free text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_attribute_type() -> String {
    "string".to_string()
}

impl AttributeDefinition {
    /// Create definition of the given type
    #[must_use]
    pub fn of_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    /// Set entry schema
    #[must_use]
    pub fn with_entry_schema(mut self, entry: impl Into<String>) -> Self {
        self.entry_schema = Some(EntrySchema {
            type_name: entry.into(),
        });
        self
    }

    /// Set default value assignment
    #[must_use]
    pub fn with_default(mut self, default: impl Into<ValueAssignment>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Schema type of the value, with `list:`/`map:` entry prefixes applied
    ///
    /// ```rust
    /// use orc_tosca::AttributeDefinition;
    ///
    /// let def = AttributeDefinition::of_type("map").with_entry_schema("tosca.datatypes.network.PortInfo");
    /// assert_eq!(def.data_type(), "map:tosca.datatypes.network.PortInfo");
    /// ```
    #[must_use]
    pub fn data_type(&self) -> String {
        match (self.type_name.as_str(), &self.entry_schema) {
            ("list" | "map", Some(entry)) => format!("{}:{}", self.type_name, entry.type_name),
            _ => self.type_name.clone(),
        }
    }
}

/// Properties are declared with the same shape as attributes
pub type PropertyDefinition = AttributeDefinition;

/// Operation of an interface
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OperationDefinition {
    /// Implementation artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,
    /// Input value assignments
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<String, ValueAssignment>,
    /// Declared outputs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, ValueAssignment>,
}

/// Interface: operation name to operation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceDefinition {
    /// Operations keyed by name
    pub operations: BTreeMap<String, OperationDefinition>,
}

/// Requirement declared by a node type
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequirementDefinition {
    /// Required capability type
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub capability: String,
    /// Relationship type used to fulfil the requirement
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub relationship: String,
    /// Restricts target node type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
}

/// Capability declared by a node type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDefinition {
    /// Capability type name
    #[serde(rename = "type")]
    pub type_name: String,
}

/// Type definition
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeDef {
    /// Category
    #[serde(default)]
    pub kind: TypeKind,
    /// Single parent type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_from: Option<String>,
    /// Free text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Property definitions
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyDefinition>,
    /// Attribute definitions
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeDefinition>,
    /// Ordered requirement definitions (node types)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<Named<RequirementDefinition>>,
    /// Capability definitions (node types)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub capabilities: BTreeMap<String, CapabilityDefinition>,
    /// Interface definitions (node and relationship types)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub interfaces: BTreeMap<String, InterfaceDefinition>,
    /// File extensions (artifact types)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_ext: Vec<String>,
}

impl TypeDef {
    /// Create empty type of `kind`
    #[must_use]
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Set parent type
    #[must_use]
    pub fn derived_from(mut self, parent: impl Into<String>) -> Self {
        self.derived_from = Some(parent.into());
        self
    }

    /// Add attribute definition
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, def: AttributeDefinition) -> Self {
        self.attributes.insert(name.into(), def);
        self
    }

    /// Add property definition
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, def: PropertyDefinition) -> Self {
        self.properties.insert(name.into(), def);
        self
    }

    /// Add capability definition
    #[must_use]
    pub fn with_capability(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.capabilities.insert(
            name.into(),
            CapabilityDefinition {
                type_name: type_name.into(),
            },
        );
        self
    }

    /// Add requirement definition
    #[must_use]
    pub fn with_requirement(mut self, name: impl Into<String>, def: RequirementDefinition) -> Self {
        self.requirements.push(Named::new(name, def));
        self
    }

    /// Add operation to an interface
    #[must_use]
    pub fn with_operation(
        mut self,
        interface: impl Into<String>,
        operation: impl Into<String>,
        def: OperationDefinition,
    ) -> Self {
        self.interfaces
            .entry(interface.into())
            .or_default()
            .operations
            .insert(operation.into(), def);
        self
    }

    /// Check whether `interface.operation` is declared directly on this type
    #[must_use]
    pub fn has_operation(&self, interface: &str, operation: &str) -> bool {
        self.interfaces
            .get(interface)
            .is_some_and(|i| i.operations.contains_key(operation))
    }

    /// Mutable access to a declared operation
    pub fn operation_mut(&mut self, interface: &str, operation: &str) -> Option<&mut OperationDefinition> {
        self.interfaces
            .get_mut(interface)
            .and_then(|i| i.operations.get_mut(operation))
    }

    /// Every value assignment an output binding may hide in
    ///
    /// Attribute defaults first, then operation inputs.
    pub fn value_assignments(&self) -> impl Iterator<Item = &ValueAssignment> {
        let defaults = self.attributes.values().filter_map(|a| a.default.as_ref());
        let inputs = self
            .interfaces
            .values()
            .flat_map(|i| i.operations.values())
            .flat_map(|op| op.inputs.values());
        defaults.chain(inputs)
    }
}
