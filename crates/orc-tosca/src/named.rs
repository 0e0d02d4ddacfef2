//! Ordered named entries
//!
//! Requirements are ordered lists of single-entry maps:
//!
//! ```yaml
//! requirements:
//!   - host: Compute
//!   - local_storage: { node: Vol, capability: tosca.capabilities.Attachment }
//! ```

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Entry of an ordered list of single-entry maps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Named<T> {
    /// Entry name
    pub name: String,
    /// Entry value
    pub value: T,
}

impl<T> Named<T> {
    /// Create named entry
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl<T: Serialize> Serialize for Named<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &self.value)?;
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Named<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = BTreeMap::<String, T>::deserialize(deserializer)?;
        let len = map.len();
        let mut entries = map.into_iter();
        match (entries.next(), entries.next()) {
            (Some((name, value)), None) => Ok(Self { name, value }),
            _ => Err(D::Error::invalid_length(len, &"a single-entry map")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_multi_entry_maps() {
        let err = serde_json::from_str::<Named<u8>>(r#"{"a": 1, "b": 2}"#).unwrap_err();
        assert!(err.to_string().contains("single-entry"));
    }

    #[test]
    fn keeps_list_order() {
        let list: Vec<Named<u8>> = serde_json::from_str(r#"[{"z": 1}, {"a": 2}]"#).unwrap();
        assert_eq!(list[0].name, "z");
        assert_eq!(list[1].value, 2);
    }
}
