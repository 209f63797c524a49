//! Analysis error types

use thiserror::Error;

/// Batch analysis error
///
/// Every variant aborts the run; nothing is reported from partial input.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Required column absent from the log header
    #[error("log is missing required column '{column}'")]
    MissingColumn { column: String },

    /// Cell that does not parse as a finite number
    #[error("row {row}: invalid value '{value}' in column '{column}'")]
    InvalidValue {
        /// 1-based data row (header excluded)
        row: usize,
        column: String,
        value: String,
    },

    /// Time went backwards
    #[error("row {row}: time {current} precedes previous time {previous}")]
    UnsortedInput {
        row: usize,
        previous: f64,
        current: f64,
    },

    /// Analysis parameters rejected
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    pub fn invalid_value(row: usize, column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            row,
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Analysis Result type alias
pub type Result<T> = std::result::Result<T, AnalysisError>;
