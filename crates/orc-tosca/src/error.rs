//! Error types for topology documents

/// Topology document errors
#[derive(Debug, thiserror::Error)]
pub enum ToscaError {
    /// Document is not valid YAML or does not match the model
    #[error("invalid topology document: {0}")]
    Parse(#[source] serde_yaml::Error),
}
