use thiserror::Error;

/// Main error type for the HyperSift system
#[derive(Error, Debug)]
pub enum HsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Task-submission errors. Raised synchronously; the task never starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Search space has no dimensions")]
    EmptySpace,

    #[error("Dimension '{name}' has no values")]
    EmptyDimension { name: String },

    #[error("Duplicate dimension name: '{name}'")]
    DuplicateDimension { name: String },

    #[error("Unknown strategy: '{name}'")]
    UnknownStrategy { name: String },

    #[error("Iteration count must be positive")]
    ZeroIterations,

    #[error(
        "Iteration budget {n_iter} is below the {required} initial positions \
         required by strategy '{strategy}'"
    )]
    IterationBudgetTooSmall {
        n_iter: usize,
        required: usize,
        strategy: String,
    },

    #[error("Parallelism must be at least 1")]
    ZeroParallelism,
}

/// Encoding/decoding errors. Abort the offending worker's INIT phase only.
#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("Unknown dimension: '{name}'")]
    UnknownDimension { name: String },

    #[error("Value {value} not found in dimension '{dimension}'")]
    ValueNotFound {
        dimension: String,
        value: serde_json::Value,
    },

    #[error("Missing value for dimension '{name}'")]
    MissingDimension { name: String },

    #[error("Coordinate vector has {got} entries, search space has {expected} dimensions")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Index {index} out of bounds for dimension '{dimension}' ({len} values)")]
    IndexOutOfBounds {
        dimension: String,
        index: usize,
        len: usize,
    },
}

/// Persisted-cache errors. The store is best effort; these are surfaced
/// for diagnostics but never fail a running worker.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache store IO failed at {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Cache store at {path} is not valid JSON: {source}")]
    Corrupt {
        path: String,
        source: serde_json::Error,
    },
}

/// Task-level failures surfaced after workers have run.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("All {failed} workers failed; no result to reduce")]
    AllWorkersFailed { failed: usize },

    #[error("Unknown task handle")]
    UnknownHandle,
}

/// Result type alias for HyperSift operations
pub type HsResult<T> = Result<T, HsError>;

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::HsError::Internal(format!($($arg)*))
    };
}
