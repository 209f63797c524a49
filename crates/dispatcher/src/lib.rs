//! # Dispatcher
//!
//! Consumer side of the live pipeline.
//!
//! - Drains decoded `Sample`s from the bounded notification channel
//! - Keeps the per-channel rolling buffers a live view reads from
//! - Fans every sample out, in order, to the durable CSV log and any extra sinks

pub mod buffer;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use buffer::{LiveBuffers, LiveSnapshot, RollingBuffer};
pub use contracts::{Sample, SampleSink};
pub use dispatcher::{create_dispatcher, DispatchReport, Dispatcher, DispatcherBuilder};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{CsvLogSink, LogSink};
