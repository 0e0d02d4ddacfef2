//! ORC Events - Deployment log entries
//!
//! - [`LogEntry`]: level, deployment, optional fields, content
//! - [`EventSink`]: fire-and-forget destination
//! - [`StoreEventSink`]: stores entries under `_orc/logs/<deployment>/<timestamp>`

#![warn(missing_docs)]

pub mod entry;
pub mod sink;

// Re-exports
pub use entry::{format_log, FieldType, LogEntry, LogLevel, CONTENT_MAX_SIZE};
pub use sink::{EventSink, StoreEventSink, TracingEventSink, LOGS_PREFIX};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
