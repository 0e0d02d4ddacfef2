//! Nested attribute mappings on stored instances

use orc_deployments::prelude::*;
use orc_deployments::{NotFoundError, ValidationError};
use orc_store::{KvStore, MemoryStore};
use orc_test_utils::{compute, RecordingEventSink, TopologyBuilder};
use orc_tosca::Value;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

const DEP: &str = "app";

fn segments(path: &[&str]) -> Vec<String> {
    path.iter().map(ToString::to_string).collect()
}

fn map<const N: usize>(entries: [(&str, Value); N]) -> Value {
    Value::Map(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<BTreeMap<_, _>>(),
    )
}

async fn server() -> Deployments {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let deployments = Deployments::new(store, RecordingEventSink::new(), DeploymentsConfig::default());
    let topology = TopologyBuilder::new().node("Server", compute(1)).build();
    deployments.store_topology(DEP, &topology).await.unwrap();
    deployments.enhance_nodes(DEP).await.unwrap();
    deployments
}

/// Writing into an unset map attribute builds every container on the path.
#[tokio::test]
async fn builds_missing_containers() {
    let d = server().await;
    d.resolve_attribute_mapping(
        DEP,
        "Server",
        "0",
        "networks",
        Value::scalar("10.0.0.5"),
        &segments(&["0", "addresses", "1"]),
    )
    .await
    .unwrap();

    let stored = d.instance_attribute(DEP, "Server", "0", "networks").await.unwrap();
    assert_eq!(
        stored,
        Some(map([(
            "0",
            map([("addresses", Value::List(vec![Value::Null, Value::scalar("10.0.0.5")]))])
        )]))
    );
}

#[tokio::test]
async fn later_writes_update_existing_value() {
    let d = server().await;
    for (value, path) in [
        ("10.0.0.5", segments(&["0", "addresses", "0"])),
        ("private", segments(&["0", "network_name"])),
        ("10.0.0.6", segments(&["0", "addresses", "0"])),
    ] {
        d.resolve_attribute_mapping(DEP, "Server", "0", "networks", Value::scalar(value), &path)
            .await
            .unwrap();
    }

    let stored = d.instance_attribute(DEP, "Server", "0", "networks").await.unwrap();
    assert_eq!(
        stored,
        Some(map([(
            "0",
            map([
                ("addresses", Value::List(vec![Value::scalar("10.0.0.6")])),
                ("network_name", Value::scalar("private")),
            ])
        )]))
    );
}

#[tokio::test]
async fn empty_path_replaces_attribute() {
    let d = server().await;
    d.resolve_attribute_mapping(DEP, "Server", "0", "public_address", Value::scalar("1.2.3.4"), &[])
        .await
        .unwrap();

    assert_eq!(
        d.instance_attribute(DEP, "Server", "0", "public_address").await.unwrap(),
        Some(Value::scalar("1.2.3.4"))
    );
}

#[tokio::test]
async fn non_numeric_list_index_fails() {
    let d = server().await;
    let err = d
        .resolve_attribute_mapping(
            DEP,
            "Server",
            "0",
            "networks",
            Value::scalar("x"),
            &segments(&["0", "addresses", "first"]),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DeploymentError::Validation(ValidationError::InvalidIndex { segment }) if segment == "first"
    ));
}

#[tokio::test]
async fn writes_capability_attribute() {
    let d = server().await;
    d.resolve_attribute_mapping(
        DEP,
        "Server",
        "0",
        "endpoint",
        Value::scalar("1.2.3.4"),
        &segments(&["ip_address"]),
    )
    .await
    .unwrap();

    assert_eq!(
        d.capability_attribute(DEP, "Server", "0", "endpoint", "ip_address")
            .await
            .unwrap(),
        Some(Value::scalar("1.2.3.4"))
    );
}

#[tokio::test]
async fn capability_write_needs_attribute_name() {
    let d = server().await;
    let err = d
        .resolve_attribute_mapping(DEP, "Server", "0", "endpoint", Value::scalar("x"), &[])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DeploymentError::Validation(ValidationError::MissingPathSegment { .. })
    ));
}

#[tokio::test]
async fn unknown_capability_fails() {
    let d = server().await;
    let err = d
        .resolve_attribute_mapping(DEP, "Server", "0", "teleport", Value::scalar("x"), &segments(&["a"]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DeploymentError::NotFound(NotFoundError::Capability { capability, .. }) if capability == "teleport"
    ));
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn repeated_mapping_is_stable(key in "[a-z]{1,8}", name in "[a-z0-9-]{1,12}") {
        let (first, second) = runtime().block_on(async {
            let d = server().await;
            let path = vec![key.clone(), "network_name".to_string()];
            d.resolve_attribute_mapping(DEP, "Server", "0", "networks", Value::scalar(&name), &path)
                .await
                .unwrap();
            let first = d.instance_attribute(DEP, "Server", "0", "networks").await.unwrap();
            d.resolve_attribute_mapping(DEP, "Server", "0", "networks", Value::scalar(&name), &path)
                .await
                .unwrap();
            let second = d.instance_attribute(DEP, "Server", "0", "networks").await.unwrap();
            (first, second)
        });
        prop_assert_eq!(&first, &second);
        let expected = map([(key.as_str(), map([("network_name", Value::scalar(&name))]))]);
        prop_assert_eq!(first, Some(expected));
    }

    #[test]
    fn first_list_write_lands_at_requested_index(index in 0usize..6) {
        let stored = runtime().block_on(async {
            let d = server().await;
            let path = vec!["eth0".to_string(), "addresses".to_string(), index.to_string()];
            d.resolve_attribute_mapping(DEP, "Server", "0", "networks", Value::scalar("ip"), &path)
                .await
                .unwrap();
            d.instance_attribute(DEP, "Server", "0", "networks").await.unwrap()
        });
        let addresses = stored
            .as_ref()
            .and_then(|v| v.get("eth0"))
            .and_then(|v| v.get("addresses"))
            .cloned();
        let Some(Value::List(items)) = addresses else {
            return Err(TestCaseError::fail("addresses is not a list"));
        };
        prop_assert_eq!(items.len(), index + 1);
        prop_assert_eq!(&items[index], &Value::scalar("ip"));
    }
}
