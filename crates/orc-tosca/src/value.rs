//! Dynamically shaped attribute values
//!
//! Every instance attribute and capability attribute holds a [`Value`]. The
//! concrete shape expected at a given path is decided by the type schema
//! ([`SchemaKind`]), never by inspecting the raw value.

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Prefix of list-shaped schema types (`list:<entry>`)
pub const LIST_PREFIX: &str = "list:";

/// Prefix of map-shaped schema types (`map:<entry>`)
pub const MAP_PREFIX: &str = "map:";

/// Primitive schema types
pub const PRIMITIVE_TYPES: &[&str] = &[
    "string",
    "integer",
    "float",
    "boolean",
    "timestamp",
    "version",
    "range",
    "scalar-unit.size",
    "scalar-unit.time",
    "scalar-unit.frequency",
];

/// Tagged attribute value
///
/// Numbers and booleans are decoded as [`Value::Scalar`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    /// Absent or explicit null
    #[default]
    Null,
    /// Any primitive, kept as text
    Scalar(String),
    /// Ordered sequence
    List(Vec<Value>),
    /// String-keyed mapping
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Create a scalar value
    #[inline]
    #[must_use]
    pub fn scalar(s: impl Into<String>) -> Self {
        Self::Scalar(s.into())
    }

    /// Create an empty list
    #[inline]
    #[must_use]
    pub fn empty_list() -> Self {
        Self::List(Vec::new())
    }

    /// Create an empty map
    #[inline]
    #[must_use]
    pub fn empty_map() -> Self {
        Self::Map(BTreeMap::new())
    }

    /// Check if null
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if null, an empty scalar, or an empty container
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Scalar(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Map(entries) => entries.is_empty(),
        }
    }

    /// Scalar text, if this is a scalar
    #[inline]
    #[must_use]
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Entry of a map value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Item of a list value
    #[must_use]
    pub fn index(&self, index: usize) -> Option<&Value> {
        match self {
            Self::List(items) => items.get(index),
            _ => None,
        }
    }

    /// Render as JSON text
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Scalar(s) => f.write_str(s),
            Self::List(_) | Self::Map(_) => f.write_str(&self.to_json()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Scalar(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Scalar(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self::Map(entries)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Scalar(s) => serializer.serialize_str(s),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar, a sequence or a mapping")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Scalar(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Scalar(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Scalar(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Scalar(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::Scalar(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::Scalar(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut entries = BTreeMap::new();
        while let Some((k, v)) = map.next_entry::<String, Value>()? {
            entries.insert(k, v);
        }
        Ok(Value::Map(entries))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

/// Structural kind declared by a schema type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    /// Primitive type
    Scalar,
    /// `list` or `list:<entry>`
    List,
    /// `map`, `map:<entry>` or a complex data type
    Map,
}

impl SchemaKind {
    /// Kind of a schema type name
    ///
    /// ```rust
    /// use orc_tosca::SchemaKind;
    ///
    /// assert_eq!(SchemaKind::of("list:string"), SchemaKind::List);
    /// assert_eq!(SchemaKind::of("map:tosca.datatypes.network.PortInfo"), SchemaKind::Map);
    /// assert_eq!(SchemaKind::of("tosca.datatypes.network.NetworkInfo"), SchemaKind::Map);
    /// assert_eq!(SchemaKind::of("integer"), SchemaKind::Scalar);
    /// ```
    #[must_use]
    pub fn of(type_name: &str) -> Self {
        if type_name == "list" || type_name.starts_with(LIST_PREFIX) {
            Self::List
        } else if type_name == "map" || type_name.starts_with(MAP_PREFIX) {
            Self::Map
        } else if is_primitive(type_name) {
            Self::Scalar
        } else {
            Self::Map
        }
    }

    /// Empty container for this kind
    ///
    /// Anything that is not a list is allocated as a map.
    #[must_use]
    pub fn empty_container(self) -> Value {
        match self {
            Self::List => Value::empty_list(),
            Self::Scalar | Self::Map => Value::empty_map(),
        }
    }
}

/// Check whether a type name is a primitive
#[inline]
#[must_use]
pub fn is_primitive(type_name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&type_name)
}
