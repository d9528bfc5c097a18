//! Error types for the preparation pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for dataset preparation.
#[derive(Error, Debug)]
pub enum PrepError {
    #[error("Data source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Data quality error: {0}")]
    DataQuality(String),

    #[error("Split boundary out of range: lookback {n_past} needs more than {train_rows} training rows")]
    IndexRange { n_past: usize, train_rows: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No data loaded")]
    NoData,

    #[error("No snapshot saved")]
    NoSnapshot,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for preparation operations.
pub type Result<T> = std::result::Result<T, PrepError>;
