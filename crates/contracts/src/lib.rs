//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace:
//! telemetry samples, decode layouts, link states, the transport and sink
//! traits, session configuration and the analysis output records.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - `Sample::timestamp` is the host receipt time in seconds (f64) from a
//!   monotonic clock; the device `seq` counter is carried for diagnostics only.

mod analysis;
mod characteristic;
mod error;
mod layout;
mod link;
mod sample;
mod session;
mod sink;
mod transport;

pub use analysis::*;
pub use characteristic::CharacteristicUuid;
pub use error::*;
pub use layout::*;
pub use link::*;
pub use sample::*;
pub use session::*;
pub use sink::*;
pub use transport::{NotificationCallback, Transport};
