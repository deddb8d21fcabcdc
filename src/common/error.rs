//! Error types for highway_path_planning

use thiserror::Error;

/// Main error type for the planner
#[derive(Debug, Error)]
pub enum PlannerError {
    /// A road map record could not be parsed
    #[error("Map format error at line {line}: {reason}")]
    MapFormat { line: usize, reason: String },
    /// The road map has no waypoints
    #[error("Map error: no waypoints loaded")]
    EmptyMap,
    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Interpolation samples must be strictly increasing
    #[error("Samples not strictly increasing at index {index}: {previous} -> {current}")]
    NonMonotonicSamples {
        index: usize,
        previous: f64,
        current: f64,
    },
    /// Numerical computation failed (linear solve, etc.)
    #[error("Numerical error: {0}")]
    NumericalError(String),
    /// Malformed simulator message
    #[error("Protocol error: {0}")]
    ProtocolError(String),
    /// Invalid configuration
    #[error("Config error: {0}")]
    ConfigError(String),
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;
