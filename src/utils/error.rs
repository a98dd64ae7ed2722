//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use crate::span::SpanId;
use thiserror::Error;

/// Misuse of the begin/end protocol or premature reads of span timings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    #[error("span {0} has not been closed yet")]
    NotClosed(SpanId),

    #[error("span {0} was already closed")]
    AlreadyClosed(SpanId),

    #[error("span {span} closed out of order (active span: {})", display_active(.active))]
    NonLifoClose {
        span: SpanId,
        active: Option<SpanId>,
    },

    #[error("span {0} is not known to this tracer")]
    UnknownSpan(SpanId),
}

fn display_active(active: &Option<SpanId>) -> String {
    match active {
        Some(id) => id.to_string(),
        None => "none".to_string(),
    }
}

/// Errors that can occur during flamegraph generation
#[derive(Error, Debug)]
pub enum FlamegraphError {
    #[error("Empty stack data")]
    EmptyStacks,
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}

/// Errors that can occur while loading a report config file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
