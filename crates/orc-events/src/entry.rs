//! Deployment log entries
//!
//! An entry is stored as a flat JSON object and rendered for humans as
//! `[timestamp][level][deploymentId][workflowId]...[type]content`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Max stored content size; the rest of an entry fits in the remaining kilobyte
pub const CONTENT_MAX_SIZE: usize = 511 * 1000;

/// Log level of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Informative
    Info,
    /// Debugging
    Debug,
    /// Warning
    Warn,
    /// Error
    Error,
}

impl LogLevel {
    /// Name as stored
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional fields of an entry, in rendering order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldType {
    /// Workflow name
    WorkflowId,
    /// Workflow execution
    ExecutionId,
    /// Node name
    NodeId,
    /// Node instance
    InstanceId,
    /// Interface name
    InterfaceName,
    /// Operation name
    OperationName,
    /// Type name
    TypeId,
}

impl FieldType {
    /// Every field, in rendering order
    pub const ALL: [Self; 7] = [
        Self::WorkflowId,
        Self::ExecutionId,
        Self::NodeId,
        Self::InstanceId,
        Self::InterfaceName,
        Self::OperationName,
        Self::TypeId,
    ];

    /// Key in the flat representation
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WorkflowId => "workflowId",
            Self::ExecutionId => "executionId",
            Self::NodeId => "nodeId",
            Self::InstanceId => "instanceId",
            Self::InterfaceName => "interfaceName",
            Self::OperationName => "operationName",
            Self::TypeId => "type",
        }
    }
}

/// Deployment log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Level
    pub level: LogLevel,
    /// Deployment the entry belongs to
    pub deployment_id: String,
    /// Optional fields
    pub fields: BTreeMap<FieldType, String>,
    /// Message
    pub content: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    /// Create entry stamped now
    #[must_use]
    pub fn new(level: LogLevel, deployment_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            level,
            deployment_id: deployment_id.into(),
            fields: BTreeMap::new(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Set an optional field
    #[must_use]
    pub fn with_field(mut self, field: FieldType, value: impl Into<String>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    /// Cut content to [`CONTENT_MAX_SIZE`] bytes on a char boundary
    ///
    /// Returns whether anything was cut.
    pub fn truncate_content(&mut self) -> bool {
        if self.content.len() <= CONTENT_MAX_SIZE {
            return false;
        }
        let mut cut = CONTENT_MAX_SIZE;
        while !self.content.is_char_boundary(cut) {
            cut -= 1;
        }
        self.content.truncate(cut);
        true
    }

    /// Store key suffix: the timestamp at nanosecond precision
    #[must_use]
    pub fn key_timestamp(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    /// Flat representation, as stored
    #[must_use]
    pub fn to_flat_map(&self) -> BTreeMap<String, String> {
        let mut flat = BTreeMap::new();
        flat.insert("deploymentId".to_string(), self.deployment_id.clone());
        flat.insert("level".to_string(), self.level.as_str().to_string());
        flat.insert("content".to_string(), self.content.clone());
        flat.insert(
            "timestamp".to_string(),
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        for (field, value) in &self.fields {
            flat.insert(field.as_str().to_string(), value.clone());
        }
        flat
    }
}

/// Render a flat entry as `[timestamp][level][deploymentId]...[type]content`
///
/// Missing fields render as `[]`.
#[must_use]
pub fn format_log(flat: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    let bracketed = ["timestamp", "level", "deploymentId"]
        .into_iter()
        .chain(FieldType::ALL.iter().map(|f| f.as_str()));
    for key in bracketed {
        out.push('[');
        if let Some(value) = flat.get(key) {
            out.push_str(value);
        }
        out.push(']');
    }
    if let Some(content) = flat.get("content") {
        out.push_str(content);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn fixed_entry() -> LogEntry {
        let mut entry = LogEntry::new(LogLevel::Warn, "dep-1", "type missing")
            .with_field(FieldType::NodeId, "Compute")
            .with_field(FieldType::TypeId, "my.Type");
        entry.timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        entry
    }

    #[test]
    fn formats_in_fixed_field_order() {
        let rendered = format_log(&fixed_entry().to_flat_map());
        assert_eq!(
            rendered,
            "[2024-05-01T12:00:00Z][WARN][dep-1][][][Compute][][][][my.Type]type missing"
        );
    }

    #[test]
    fn truncates_on_char_boundary() {
        let mut entry = LogEntry::new(LogLevel::Info, "d", "é".repeat(CONTENT_MAX_SIZE));
        assert!(entry.truncate_content());
        assert!(entry.content.len() <= CONTENT_MAX_SIZE);
        assert!(entry.content.len() >= CONTENT_MAX_SIZE - 1);

        let mut small = LogEntry::new(LogLevel::Info, "d", "ok");
        assert!(!small.truncate_content());
    }

    #[test]
    fn key_timestamp_has_nanoseconds() {
        assert_eq!(fixed_entry().key_timestamp(), "2024-05-01T12:00:00.000000000Z");
    }

    #[test]
    fn level_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&LogLevel::Error).unwrap(), "\"ERROR\"");
    }
}
