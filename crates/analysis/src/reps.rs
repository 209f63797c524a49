//! Hysteresis rep segmentation over angular-rate magnitude

use contracts::{Rep, RepDetectionConfig};
use tracing::{debug, instrument, warn};

use crate::error::{AnalysisError, Result};
use crate::log::{ensure_sorted, GyroRow};

/// Segmentation output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segmentation {
    /// Emitted reps, indexed 1..=n in order
    pub reps: Vec<Rep>,

    /// Start of a rep still open when the input ended. It is never emitted
    /// as a rep; callers may warn about it.
    pub unterminated_start: Option<f64>,

    /// Closed candidates shorter than the minimum duration
    pub rejected: usize,
}

/// Splits a set into reps with a start/stop threshold pair
#[derive(Debug, Clone)]
pub struct RepSegmenter {
    config: RepDetectionConfig,
}

impl RepSegmenter {
    pub fn new(config: RepDetectionConfig) -> Result<Self> {
        let finite = [
            config.start_threshold,
            config.stop_threshold,
            config.min_rep_duration,
        ]
        .iter()
        .all(|v| v.is_finite() && *v >= 0.0);
        if !finite {
            return Err(AnalysisError::invalid_parameter(
                "reps",
                "thresholds and minimum duration must be finite and >= 0",
            ));
        }
        if config.stop_threshold >= config.start_threshold {
            return Err(AnalysisError::invalid_parameter(
                "reps.stop_threshold",
                "must be < start_threshold",
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &RepDetectionConfig {
        &self.config
    }

    /// Segment rows already ordered by time
    #[instrument(name = "rep_segment", skip(self, rows), fields(rows = rows.len()))]
    pub fn segment(&self, rows: &[GyroRow]) -> Result<Segmentation> {
        ensure_sorted(rows)?;
        let segmentation = self.segment_magnitudes(rows.iter().map(|r| (r.time, r.magnitude())));

        observability::record_reps_detected(segmentation.reps.len());
        if let Some(start) = segmentation.unterminated_start {
            warn!(start, "Rep still open at end of log; not counted");
        }
        debug!(
            reps = segmentation.reps.len(),
            rejected = segmentation.rejected,
            "Segmentation complete"
        );
        Ok(segmentation)
    }

    /// Segment a `(time, gmag)` series in one pass
    pub fn segment_magnitudes(&self, series: impl IntoIterator<Item = (f64, f64)>) -> Segmentation {
        let RepDetectionConfig {
            start_threshold,
            stop_threshold,
            min_rep_duration,
        } = self.config;

        let mut out = Segmentation::default();
        let mut rep_start: Option<f64> = None;

        for (time, gmag) in series {
            match rep_start {
                None if gmag > start_threshold => rep_start = Some(time),
                Some(start) if gmag < stop_threshold => {
                    if time - start >= min_rep_duration {
                        out.reps.push(Rep {
                            index: out.reps.len() + 1,
                            start_time: start,
                            end_time: time,
                        });
                    } else {
                        out.rejected += 1;
                    }
                    rep_start = None;
                }
                _ => {}
            }
        }

        out.unterminated_start = rep_start;
        out
    }
}
