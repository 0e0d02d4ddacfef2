//! Topology sources

use crate::error::{DeploymentError, Result};
use async_trait::async_trait;
use orc_tosca::Topology;
use std::path::Path;

/// Supplies parsed topologies
#[async_trait]
pub trait TopologyProvider: Send + Sync + std::fmt::Debug {
    /// Load the topology at `path`
    async fn load(&self, path: &Path) -> Result<Topology>;
}

/// Reads YAML topology files
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlTopologyProvider;

#[async_trait]
impl TopologyProvider for YamlTopologyProvider {
    async fn load(&self, path: &Path) -> Result<Topology> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| DeploymentError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Topology::from_yaml_str(&text).map_err(|source| DeploymentError::Topology {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn loads_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "topology_template:\n  node_templates:\n    Web:\n      type: tosca.nodes.WebServer"
        )
        .unwrap();

        let topology = YamlTopologyProvider.load(file.path()).await.unwrap();
        assert_eq!(topology.nodes()["Web"].type_name, "tosca.nodes.WebServer");
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = YamlTopologyProvider
            .load(&dir.path().join("absent.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeploymentError::Io { .. }));
    }

    #[tokio::test]
    async fn invalid_yaml_is_topology_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "topology_template: [not, a, map").unwrap();

        let err = YamlTopologyProvider.load(file.path()).await.unwrap_err();
        assert!(matches!(err, DeploymentError::Topology { .. }));
    }
}
