//! Recording pipeline orchestration.

mod orchestrator;
mod stats;

pub use orchestrator::{Pipeline, PipelineConfig, StopReason};
pub use stats::PipelineStats;
