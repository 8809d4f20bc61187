use thiserror::Error;

/// Errors raised while validating or tracing a sample batch
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Sample table has no rows")]
    EmptyInput,

    #[error("Row {row} has {found} columns, expected {expected}")]
    ColumnCount {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("Non-finite value at row {row}, column {column}")]
    NonFinite { row: usize, column: usize },

    #[error("Timestamp at row {row} ({current}) does not advance past previous ({previous})")]
    NonMonotonicTimestamp {
        row: usize,
        previous: f64,
        current: f64,
    },

    #[error("Length mismatch: {0}")]
    LengthMismatch(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for tracing operations
pub type TraceResult<T> = Result<T, TraceError>;
