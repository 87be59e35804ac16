use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the forecasting pipeline
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Required column '{0}' not found")]
    MissingColumn(String),

    #[error("Row {row}: cannot parse date '{value}' (expected DD-Mon-YYYY)")]
    DateParse { row: usize, value: String },

    #[error("Not enough data: {rows} rows after cleaning, need at least {required}")]
    InsufficientData { rows: usize, required: usize },

    #[error("Expected {expected} feature columns, found {found}")]
    FeatureMismatch { expected: usize, found: usize },

    #[error("Non-finite value in column '{column}' at row {row}")]
    NonFiniteValue { row: usize, column: String },

    #[error("Model error: {0}")]
    Model(String),
}
