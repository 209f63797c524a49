//! Ingestion error types

use contracts::ContractError;
use thiserror::Error;

/// Ingestion error
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Payload shorter than the configured layout
    #[error("malformed packet: expected at least {expected} bytes, got {actual}")]
    MalformedPacket {
        /// Minimum length implied by the layout
        expected: usize,
        /// Received payload length
        actual: usize,
    },

    /// Layout rejected at decoder construction
    #[error("invalid decode layout: {0}")]
    InvalidLayout(#[from] ContractError),

    /// Downstream channel closed
    #[error("sample channel closed")]
    ChannelClosed,
}

impl IngestionError {
    pub fn malformed(expected: usize, actual: usize) -> Self {
        Self::MalformedPacket { expected, actual }
    }
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
