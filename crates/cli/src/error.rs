//! Error types for CLI operations.

use std::path::Path;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Sample log not found
    #[error("Sample log not found: {path} (record a set first)")]
    LogNotFound { path: String },

    /// Command-line override rejected by validation
    #[error("Invalid override: {0}")]
    InvalidOverride(#[from] contracts::ContractError),
}

impl CliError {
    pub fn config_not_found(path: &Path) -> Self {
        Self::ConfigNotFound {
            path: path.display().to_string(),
        }
    }

    pub fn log_not_found(path: &Path) -> Self {
        Self::LogNotFound {
            path: path.display().to_string(),
        }
    }
}
