//! Link states, device opcodes and observer events

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection lifecycle state (one per link)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Streaming,
}

impl ConnectionState {
    /// Whether a link to the device is established
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Streaming)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Streaming => "streaming",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-byte device command
///
/// Semantics are device-defined; the link only guarantees ordered,
/// acknowledged delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opcode {
    /// Stop streaming device-side
    Stop,
    /// Start streaming device-side
    Start,
    /// Reset the device sequence counter
    ResetSeq,
}

impl Opcode {
    /// Wire value
    pub fn code(self) -> u8 {
        match self {
            Opcode::Stop => 0x00,
            Opcode::Start => 0x01,
            Opcode::ResetSeq => 0x02,
        }
    }

    /// Decode a wire value
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Opcode::Stop),
            0x01 => Some(Opcode::Start),
            0x02 => Some(Opcode::ResetSeq),
            _ => None,
        }
    }

    /// Operator-facing label
    pub fn label(self) -> &'static str {
        match self {
            Opcode::Stop => "STOP",
            Opcode::Start => "START",
            Opcode::ResetSeq => "RESET SEQ",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.label(), self.code())
    }
}

/// Observable link event, consumed by status displays
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    /// A lifecycle step happened; `message` is operator-facing text
    Status {
        state: ConnectionState,
        message: String,
    },

    /// Connected/Disconnected edge
    Connectivity(bool),

    /// An inbound packet could not be decoded (stream continues)
    DecodeError { len: usize, message: String },
}
