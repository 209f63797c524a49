//! # Analysis
//!
//! Offline batch processing of a recorded sample log.
//!
//! ```no_run
//! use analysis::{LogReader, RepSegmenter};
//! use contracts::RepDetectionConfig;
//!
//! let rows = LogReader::from_path("ble_decoded.csv")?.gyro_rows()?;
//! let segmentation = RepSegmenter::new(RepDetectionConfig::default())?.segment(&rows)?;
//! for rep in &segmentation.reps {
//!     println!("Rep {}: {:.2}s", rep.index, rep.duration());
//! }
//! # Ok::<(), analysis::AnalysisError>(())
//! ```

pub mod error;
pub mod log;
pub mod report;
pub mod reps;
pub mod trajectory;

pub use error::{AnalysisError, Result};
pub use log::{ensure_sorted, sort_by_time, AccelRow, GyroRow, LogReader, TimedRow};
pub use report::{write_rep_report, write_trajectory_report};
pub use reps::{RepSegmenter, Segmentation};
pub use trajectory::{DriftDiagnostics, TrajectoryEstimator, TrajectoryReport};
