//! Error types for the key-value store

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend unreachable or refused the operation (transient)
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Value could not be serialized
    #[error("failed to encode value for key {key}: {source}")]
    Encode {
        /// Target key
        key: String,
        /// Serializer error
        #[source]
        source: serde_json::Error,
    },

    /// Stored bytes could not be deserialized
    #[error("failed to decode value at key {key}: {source}")]
    Decode {
        /// Source key
        key: String,
        /// Deserializer error
        #[source]
        source: serde_json::Error,
    },

    /// Write skipped because its context was cancelled
    #[error("store operation cancelled")]
    Cancelled,
}

impl StoreError {
    /// Create an unavailable error
    #[inline]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Create a decode error for key
    #[inline]
    pub fn decode(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            key: key.into(),
            source,
        }
    }

    /// Create an encode error for key
    #[inline]
    pub fn encode(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Encode {
            key: key.into(),
            source,
        }
    }

    /// Check if the error is transient
    ///
    /// Transient errors are surfaced to the caller, never retried here.
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_is_transient() {
        assert!(StoreError::unavailable("consul down").is_transient());
        assert!(!StoreError::Cancelled.is_transient());
    }

    #[test]
    fn decode_error_names_key() {
        let source = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = StoreError::decode("a/b", source);
        assert!(err.to_string().contains("a/b"));
    }
}
