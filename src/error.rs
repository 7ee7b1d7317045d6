//! Error types for the bout engine

use thiserror::Error;

/// Errors that can occur while decoding input or running the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("failed to parse input: {0}")]
    Parse(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A matched interval's start time fell outside every merged bout range.
    /// Unreachable when the merge sweep is correct; surfaced loudly when not.
    #[error(
        "interval for behavior '{behavior}' starting at {start_time}s maps to no merged bout range"
    )]
    UnassignedInterval { behavior: String, start_time: f64 },
}
