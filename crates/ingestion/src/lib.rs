//! # Ingestion
//!
//! Telemetry packet ingestion.
//!
//! Responsibilities:
//! - Compile a `DecodeLayout` into a `PacketDecoder` (and its inverse encoder)
//! - Stamp each notification with a monotonic receipt time
//! - Decode and forward samples without blocking the delivery context
//! - Drop policy and metrics when the downstream channel is full
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{IngestionMetrics, NotificationHandler, PacketDecoder};
//!
//! let decoder = Arc::new(PacketDecoder::new(&config.decode)?);
//! let (tx, rx) = async_channel::bounded(config.live.channel_capacity);
//! let handler = Arc::new(NotificationHandler::new(decoder, tx, Arc::new(IngestionMetrics::new())));
//!
//! handler.activate();
//! transport.subscribe(&notify_uuid, handler.callback()).await?;
//! while let Ok(sample) = rx.recv().await {
//!     // Forward to sinks
//! }
//! ```

mod clock;
mod config;
mod decoder;
mod error;
mod handler;

// Re-exports
pub use clock::MonotonicClock;
pub use config::{IngestionMetrics, MetricsSnapshot};
pub use contracts::Sample;
pub use decoder::{PacketDecoder, PacketEncoder};
pub use error::{IngestionError, Result};
pub use handler::NotificationHandler;
