//! Link error types

use contracts::{ContractError, Opcode};
use ingestion::IngestionError;
use thiserror::Error;

/// Link-level error
#[derive(Debug, Error)]
pub enum LinkError {
    /// Link establishment failed or timed out
    #[error("failed to connect to {address}: {message}")]
    Connect { address: String, message: String },

    /// Notification characteristic absent after discovery settled
    #[error("notify characteristic {characteristic} not found")]
    NotifyTargetNotFound { characteristic: String },

    /// Subscription rejected by the transport
    #[error("failed to subscribe to {characteristic}: {message}")]
    Subscribe {
        characteristic: String,
        message: String,
    },

    /// Unsubscribe failed for a reason other than "not subscribed"
    #[error("failed to unsubscribe from {characteristic}: {message}")]
    Unsubscribe {
        characteristic: String,
        message: String,
    },

    /// Opcode write rejected
    #[error("failed to write {opcode}: {message}")]
    CommandWrite { opcode: Opcode, message: String },

    /// Link teardown reported an error (state is Disconnected regardless)
    #[error("disconnect error: {message}")]
    Disconnect { message: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Wrapped IngestionError
    #[error(transparent)]
    Ingestion(#[from] IngestionError),
}

impl LinkError {
    pub fn connect(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            address: address.into(),
            message: message.into(),
        }
    }

    pub fn command_write(opcode: Opcode, message: impl Into<String>) -> Self {
        Self::CommandWrite {
            opcode,
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, LinkError>;
