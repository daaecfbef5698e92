//! Error types for the stylized facts engine

use thiserror::Error;

/// Main error type for the stylized facts engine
#[derive(Error, Debug)]
pub enum StylizedFactsError {
    /// Upstream data violates a precondition (non-positive price, non-positive tail value)
    #[error("Data error: {0}")]
    DataError(String),

    /// Array of the wrong rank passed to a two-dimensional estimator
    #[error("Shape error: {0}")]
    ShapeError(String),

    /// Invalid argument value (unsorted input, bad lag, non-monotonic index)
    #[error("Value error: {0}")]
    ValueError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Result type alias for stylized facts operations
pub type Result<T> = std::result::Result<T, StylizedFactsError>;
