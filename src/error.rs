//! Error types for rust_anova

use thiserror::Error;

/// Main error type for significance analysis
#[derive(Error, Debug)]
pub enum AnovaError {
    #[error("Invalid normalization reference {reference} for field '{field}': {reason}")]
    InvalidReference {
        field: String,
        reference: f64,
        reason: String,
    },

    #[error("No grouping factors supplied")]
    EmptyFactorSet,

    #[error("Factor '{factor}' listed more than once")]
    DuplicateFactor { factor: String },

    #[error("Term '{term}' has no observations in cell ({cell})")]
    InsufficientGroups { term: String, cell: String },

    #[error("Factor '{factor}' has a single level '{level}' and cannot be tested")]
    DegenerateFactor { factor: String, level: String },

    #[error("Record {record} is missing field '{field}'")]
    MissingField { field: String, record: usize },

    #[error("Invalid value for field '{field}' in record {record}: {reason}")]
    InvalidValue {
        field: String,
        record: usize,
        reason: String,
    },

    #[error("Empty data: {reason}")]
    EmptyData { reason: String },

    #[error("No residual degrees of freedom: {observations} observations, {parameters} model parameters")]
    NoResidualDegreesOfFreedom {
        observations: usize,
        parameters: usize,
    },

    #[error("Numerical instability in {operation}: {details}")]
    NumericalInstability { operation: String, details: String },

    #[error("Post-hoc test for factor '{factor}' failed: {reason}")]
    PostHocFailure { factor: String, reason: String },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Unsupported file format: {path}")]
    UnsupportedFormat { path: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Plotting error: {0}")]
    PlottingError(String),
}

/// Result type alias for analysis operations
pub type Result<T> = std::result::Result<T, AnovaError>;
