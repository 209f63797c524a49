//! # Link
//!
//! Radio link management for the wearable IMU.
//!
//! Responsibilities:
//! - Drive a `Transport` through the connection lifecycle
//! - Discover and subscribe to the notify characteristic
//! - Deliver device opcodes with acknowledgment
//! - Publish status and connectivity events
//! - Provide Mock and Simulated transports
//!
//! ## Usage Example
//!
//! ```ignore
//! use link::{ConnectionLifecycle, SimulatedDevice, SimulatedConfig};
//!
//! let device = SimulatedDevice::new(&config.link, &config.decode, SimulatedConfig::default())?;
//! let mut lifecycle = ConnectionLifecycle::new(device, config.link.clone(), handler);
//!
//! lifecycle.send_command(Opcode::Start).await?;
//! lifecycle.start_streaming().await?;
//! // ...
//! lifecycle.disconnect().await?;
//! ```

pub mod error;
pub mod lifecycle;
pub mod mock_transport;
pub mod simulated;

pub use contracts::{ConnectionState, LinkEvent, Opcode, Transport};
pub use error::{LinkError, Result};
pub use lifecycle::{ConnectionLifecycle, EVENT_CAPACITY};
pub use mock_transport::{MockConfig, MockTransport};
pub use simulated::{LiftMotion, SimulatedConfig, SimulatedDevice};
