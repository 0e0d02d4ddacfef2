//! Attribute Mapping Resolver
//!
//! Nested writes into instance and capability attribute values:
//! - **build**: allocate a skeleton shaped by the type schema when the
//!   attribute has no value yet
//! - **update**: walk the path and replace the leaf
//!
//! Both are pure over [`Value`]; build only needs a [`NestedTypeLookup`].
//! Persisting is done by [`Deployments::resolve_attribute_mapping`], which
//! rewrites the whole attribute value on every call (last write wins).

use crate::deployments::Deployments;
use crate::error::{DeploymentError, NotFoundError, Result, ValidationError};
use crate::keys;
use crate::types::NestedTypeLookup;
use orc_store::KvStoreExt;
use orc_tosca::{SchemaKind, Value};

/// Largest list index a build allocates room for
pub const MAX_LIST_INDEX: usize = 1 << 16;

/// Parse a list index segment
///
/// # Errors
/// Returns [`ValidationError::InvalidIndex`] for non-numeric or negative segments.
pub fn parse_index(segment: &str) -> Result<usize> {
    segment.parse::<usize>().map_err(|_| invalid_index(segment))
}

/// Length of a list holding the index given by `segment`
fn list_len(segment: &str) -> Result<usize> {
    let index = parse_index(segment)?;
    if index > MAX_LIST_INDEX {
        return Err(invalid_index(segment));
    }
    Ok(index + 1)
}

fn invalid_index(segment: &str) -> DeploymentError {
    ValidationError::InvalidIndex {
        segment: segment.to_string(),
    }
    .into()
}

/// Build an empty value for `base` covering `path`
///
/// For each segment `i`, the type reached by `path[..=i]` decides the child
/// container attached at segment `i`: a list is sized to hold the index given
/// by segment `i + 1`, anything else is a map. Building stops with the
/// partial skeleton as soon as the schema cannot follow the path.
///
/// # Errors
/// Returns [`ValidationError::InvalidIndex`] if a list index segment is not a
/// number or exceeds [`MAX_LIST_INDEX`], and lookup errors as is.
pub async fn build_value(lookup: &dyn NestedTypeLookup, base: &str, path: &[String]) -> Result<Value> {
    let mut containers = vec![SchemaKind::of(base).empty_container()];

    for i in 0..path.len() {
        let Some(data_type) = lookup.nested_type(base, &path[..=i]).await? else {
            break;
        };
        let child = match SchemaKind::of(&data_type) {
            SchemaKind::List => match path.get(i + 1) {
                Some(next) => Value::List(vec![Value::Null; list_len(next)?]),
                None => Value::empty_list(),
            },
            SchemaKind::Map | SchemaKind::Scalar => Value::empty_map(),
        };
        containers.push(child);
    }

    // Attach each container to its parent, deepest first
    while containers.len() > 1 {
        let depth = containers.len() - 1;
        let child = containers.pop().unwrap_or_default();
        if let Some(parent) = containers.last_mut() {
            attach(parent, &path[depth - 1], child)?;
        }
    }
    Ok(containers.pop().unwrap_or_default())
}

fn attach(parent: &mut Value, segment: &str, child: Value) -> Result<()> {
    match parent {
        Value::Map(entries) => {
            entries.insert(segment.to_string(), child);
        }
        Value::List(items) => {
            let len = list_len(segment)?;
            if len > items.len() {
                items.resize(len, Value::Null);
            }
            items[len - 1] = child;
        }
        Value::Null | Value::Scalar(_) => {}
    }
    Ok(())
}

/// Write `new` at `path` inside `value` and return the whole value
///
/// - a list segment must be a non-negative integer
/// - the final list segment replaces in bounds and otherwise **appends**, so
///   the leaf does not land at the requested index when the list is more than
///   one element short
/// - a non-final list segment out of bounds fails
/// - the final map segment upserts; a non-final map segment descends into
///   the key even when absent, leaving the value unchanged
///
/// # Errors
/// Returns [`ValidationError::InvalidIndex`] or [`NotFoundError::Index`].
pub fn update_value(mut value: Value, new: Value, path: &[String]) -> Result<Value> {
    if path.is_empty() {
        return Ok(new);
    }
    update_at(&mut value, new, path)?;
    Ok(value)
}

fn update_at(current: &mut Value, new: Value, path: &[String]) -> Result<()> {
    let Some((segment, rest)) = path.split_first() else {
        return Ok(());
    };
    match current {
        Value::List(items) => {
            let index = parse_index(segment)?;
            if rest.is_empty() {
                if index < items.len() {
                    items[index] = new;
                } else {
                    items.push(new);
                }
                return Ok(());
            }
            let len = items.len();
            match items.get_mut(index) {
                Some(next) => update_at(next, new, rest),
                None => Err(NotFoundError::Index { index, len }.into()),
            }
        }
        Value::Map(entries) => {
            if rest.is_empty() {
                entries.insert(segment.clone(), new);
                return Ok(());
            }
            match entries.get_mut(segment) {
                Some(next) => update_at(next, new, rest),
                None => Ok(()),
            }
        }
        Value::Null | Value::Scalar(_) => Ok(()),
    }
}

impl Deployments {
    /// Write `value` at `path` inside an instance or capability attribute
    ///
    /// When `capability_or_attribute` is an attribute of the node the write
    /// targets that instance attribute. Otherwise it names a capability and
    /// `path[0]` is the capability attribute.
    ///
    /// The whole attribute is read, rebuilt and rewritten with no concurrency
    /// check: two concurrent calls on one attribute can lose an update.
    ///
    /// # Errors
    /// Returns [`ValidationError::MissingPathSegment`] for a capability write
    /// without attribute name, [`NotFoundError::Capability`] for an unknown
    /// capability, and build/update errors.
    pub async fn resolve_attribute_mapping(
        &self,
        deployment: &str,
        node: &str,
        instance: &str,
        capability_or_attribute: &str,
        value: Value,
        path: &[String],
    ) -> Result<()> {
        let node_type = self.node_type(deployment, node).await?;
        let attributes = self.node_attribute_names(deployment, node).await?;

        if attributes.contains(capability_or_attribute) {
            let attribute = capability_or_attribute;
            let current = self
                .instance_attribute_or_default(deployment, node, instance, attribute)
                .await?;
            let base = self
                .types()
                .attribute_data_type(deployment, &node_type, attribute)
                .await?;
            let key = keys::instance_attribute(deployment, node, instance, attribute);
            return self.resolve_nested(deployment, key, current, &base, value, path).await;
        }

        let capability = capability_or_attribute;
        let Some((attribute, nested)) = path.split_first() else {
            return Err(ValidationError::MissingPathSegment {
                node: node.to_string(),
                capability: capability.to_string(),
            }
            .into());
        };
        let capability_type = self
            .types()
            .capability_type(deployment, &node_type, capability)
            .await?
            .ok_or_else(|| NotFoundError::Capability {
                node: node.to_string(),
                capability: capability.to_string(),
            })?;

        let current = self
            .capability_attribute(deployment, node, instance, capability, attribute)
            .await?;
        let base = self
            .types()
            .attribute_data_type(deployment, &capability_type, attribute)
            .await?;
        let key = keys::capability_attribute(deployment, node, instance, capability, attribute);
        self.resolve_nested(deployment, key, current, &base, value, nested).await
    }

    async fn resolve_nested(
        &self,
        deployment: &str,
        key: String,
        current: Option<Value>,
        base: &str,
        value: Value,
        path: &[String],
    ) -> Result<()> {
        if path.is_empty() {
            self.store().set_json(&key, &value).await?;
            return Ok(());
        }

        let current = match current {
            Some(existing) if !existing.is_null() => existing,
            _ => build_value(&self.types().for_deployment(deployment), base, path).await?,
        };
        let updated = update_value(current, value, path)?;
        tracing::debug!(deployment, key = %key, "attribute mapping resolved");
        self.store().set_json(&key, &updated).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    /// Schema lookup over a fixed table of path -> type
    struct Schema(BTreeMap<String, String>);

    impl Schema {
        fn new(entries: &[(&str, &str)]) -> Self {
            Self(
                entries
                    .iter()
                    .map(|(p, t)| ((*p).to_string(), (*t).to_string()))
                    .collect(),
            )
        }
    }

    #[async_trait]
    impl NestedTypeLookup for Schema {
        async fn nested_type(&self, _base: &str, path: &[String]) -> Result<Option<String>> {
            Ok(self.0.get(&path.join("/")).cloned())
        }
    }

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(ToString::to_string).collect()
    }

    fn map(entries: Vec<(&str, Value)>) -> Value {
        Value::Map(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    #[tokio::test]
    async fn build_then_update_map_list_map() {
        let schema = Schema::new(&[("a", "list:Item"), ("a/2", "Item"), ("a/2/b", "string")]);
        let p = path(&["a", "2", "b"]);

        let built = build_value(&schema, "Root", &p).await.unwrap();
        let updated = update_value(built, Value::scalar("leaf"), &p).unwrap();

        let Some(Value::List(items)) = updated.get("a") else {
            panic!("a should be a list: {updated:?}");
        };
        assert!(items.len() >= 3);
        assert_eq!(items[2].get("b"), Some(&Value::scalar("leaf")));
    }

    #[tokio::test]
    async fn build_stops_where_schema_ends() {
        let schema = Schema::new(&[("a", "Item")]);
        let built = build_value(&schema, "Root", &path(&["a", "b", "c"])).await.unwrap();
        assert_eq!(built, map(vec![("a", Value::empty_map())]));
    }

    #[tokio::test]
    async fn build_list_root() {
        let schema = Schema::new(&[("1", "Item")]);
        let built = build_value(&schema, "list:Item", &path(&["1", "x"])).await.unwrap();
        assert_eq!(built, Value::List(vec![Value::Null, Value::empty_map()]));
    }

    #[tokio::test]
    async fn build_rejects_non_numeric_list_index() {
        let schema = Schema::new(&[("a", "list:string")]);
        let err = build_value(&schema, "Root", &path(&["a", "first"])).await.unwrap_err();
        assert!(matches!(
            err,
            DeploymentError::Validation(ValidationError::InvalidIndex { .. })
        ));
    }

    #[tokio::test]
    async fn build_rejects_oversized_list_index() {
        let schema = Schema::new(&[("a", "list:string")]);
        for segment in [usize::MAX.to_string(), "99999999999".to_string()] {
            let err = build_value(&schema, "Root", &path(&["a", segment.as_str()])).await.unwrap_err();
            assert!(matches!(
                err,
                DeploymentError::Validation(ValidationError::InvalidIndex { .. })
            ));
        }
    }

    #[tokio::test]
    async fn build_list_root_rejects_oversized_index() {
        let huge = (MAX_LIST_INDEX + 1).to_string();
        let schema = Schema::new(&[(huge.as_str(), "Item")]);
        let err = build_value(&schema, "list:Item", &path(&[huge.as_str()])).await.unwrap_err();
        assert!(matches!(
            err,
            DeploymentError::Validation(ValidationError::InvalidIndex { .. })
        ));
    }

    #[tokio::test]
    async fn build_list_at_last_segment_is_empty() {
        let schema = Schema::new(&[("a", "list:string")]);
        let built = build_value(&schema, "Root", &path(&["a"])).await.unwrap();
        assert_eq!(built, map(vec![("a", Value::empty_list())]));
    }

    /// Writing beyond len + 1 appends: the list grows by one, not to index + 1.
    #[test]
    fn update_appends_beyond_list_end() {
        let value = map(vec![("a", Value::List(vec![Value::scalar("x"), Value::scalar("y")]))]);
        let updated = update_value(value, Value::scalar("z"), &path(&["a", "5"])).unwrap();

        let Some(Value::List(items)) = updated.get("a") else {
            panic!("a should stay a list");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[2], Value::scalar("z"));
    }

    #[test]
    fn update_replaces_in_bounds() {
        let value = Value::List(vec![Value::scalar("x"), Value::scalar("y")]);
        let updated = update_value(value, Value::scalar("z"), &path(&["0"])).unwrap();
        assert_eq!(updated, Value::List(vec![Value::scalar("z"), Value::scalar("y")]));
    }

    #[test]
    fn update_non_final_out_of_bounds_fails() {
        let value = Value::List(vec![Value::empty_map()]);
        let err = update_value(value, Value::scalar("z"), &path(&["3", "k"])).unwrap_err();
        assert!(matches!(
            err,
            DeploymentError::NotFound(NotFoundError::Index { index: 3, len: 1 })
        ));
    }

    #[test]
    fn update_rejects_negative_index() {
        let value = Value::List(vec![]);
        let err = update_value(value, Value::scalar("z"), &path(&["-1"])).unwrap_err();
        assert!(matches!(
            err,
            DeploymentError::Validation(ValidationError::InvalidIndex { .. })
        ));
    }

    /// Descending into an absent map key is not an error and leaves the value as is.
    #[test]
    fn update_descends_into_absent_key_silently() {
        let value = map(vec![("a", Value::empty_map())]);
        let updated = update_value(value.clone(), Value::scalar("z"), &path(&["a", "missing", "leaf"])).unwrap();
        assert_eq!(updated, value);
    }

    #[test]
    fn update_returns_whole_value_for_nested_append() {
        let value = map(vec![(
            "outer",
            map(vec![("list", Value::List(vec![Value::scalar("0")]))]),
        )]);
        let updated = update_value(value, Value::scalar("1"), &path(&["outer", "list", "1"])).unwrap();
        assert_eq!(
            updated.get("outer").and_then(|o| o.get("list")),
            Some(&Value::List(vec![Value::scalar("0"), Value::scalar("1")]))
        );
    }

    #[test]
    fn update_without_path_replaces() {
        let updated = update_value(Value::empty_map(), Value::scalar("v"), &[]).unwrap();
        assert_eq!(updated, Value::scalar("v"));
    }
}
