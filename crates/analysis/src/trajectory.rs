//! 2D bar-path estimation by double integration
//!
//! Steps, in this order: per-axis median bias removal, rectangular velocity
//! integration, whole-window velocity mean removal, rectangular position
//! integration. The mean removal assumes the motion returns to where it
//! started; on a net displacement the trace is wrong and nothing flags it
//! beyond the diagnostics.

use contracts::{TrajectoryConfig, TrajectoryPoint};
use tracing::{debug, instrument, warn};

use crate::error::{AnalysisError, Result};
use crate::log::{ensure_sorted, AccelRow};

/// Values removed along the way, for judging how much to trust a trace
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriftDiagnostics {
    /// Last minus first timestamp (seconds)
    pub window_s: f64,
    /// Median acceleration subtracted per axis (g)
    pub bias_x: f64,
    pub bias_z: f64,
    /// Mean velocity subtracted per axis (g·s)
    pub velocity_mean_x: f64,
    pub velocity_mean_z: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrajectoryReport {
    /// One point per input row, same order
    pub points: Vec<TrajectoryPoint>,
    pub diagnostics: DriftDiagnostics,
    /// Window longer than the configured maximum
    pub exceeds_recommended_window: bool,
}

/// Batch trajectory estimator
#[derive(Debug, Clone)]
pub struct TrajectoryEstimator {
    config: TrajectoryConfig,
}

impl TrajectoryEstimator {
    pub fn new(config: TrajectoryConfig) -> Result<Self> {
        if !(config.max_window_s.is_finite() && config.max_window_s > 0.0) {
            return Err(AnalysisError::invalid_parameter(
                "trajectory.max_window_s",
                "must be finite and > 0",
            ));
        }
        Ok(Self { config })
    }

    /// Estimate the x/z trace for rows already ordered by time
    #[instrument(name = "trajectory_estimate", skip(self, rows), fields(rows = rows.len()))]
    pub fn estimate(&self, rows: &[AccelRow]) -> Result<TrajectoryReport> {
        ensure_sorted(rows)?;
        let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
            return Ok(TrajectoryReport::default());
        };

        let dt: Vec<f64> = std::iter::once(0.0)
            .chain(rows.windows(2).map(|w| w[1].time - w[0].time))
            .collect();

        let ax: Vec<f64> = rows.iter().map(|r| r.ax).collect();
        let az: Vec<f64> = rows.iter().map(|r| r.az).collect();
        let x = integrate_axis(&ax, &dt);
        let z = integrate_axis(&az, &dt);

        let diagnostics = DriftDiagnostics {
            window_s: last.time - first.time,
            bias_x: x.bias,
            bias_z: z.bias,
            velocity_mean_x: x.velocity_mean,
            velocity_mean_z: z.velocity_mean,
        };
        let exceeds_recommended_window = diagnostics.window_s > self.config.max_window_s;
        if exceeds_recommended_window {
            warn!(
                window_s = diagnostics.window_s,
                max_window_s = self.config.max_window_s,
                "Trajectory window exceeds recommended length; integration drift dominates"
            );
        }

        let points = rows
            .iter()
            .zip(x.position.iter().zip(&z.position))
            .map(|(row, (&position_x, &position_z))| TrajectoryPoint {
                time: row.time,
                position_x,
                position_z,
            })
            .collect();

        debug!(?diagnostics, "Trajectory estimated");
        Ok(TrajectoryReport {
            points,
            diagnostics,
            exceeds_recommended_window,
        })
    }
}

struct AxisTrace {
    position: Vec<f64>,
    bias: f64,
    velocity_mean: f64,
}

fn integrate_axis(accel: &[f64], dt: &[f64]) -> AxisTrace {
    let bias = median(accel);

    let mut velocity = cumulative(accel.iter().zip(dt).map(|(a, dt)| (a - bias) * dt));
    let velocity_mean = velocity.iter().sum::<f64>() / velocity.len() as f64;
    velocity.iter_mut().for_each(|v| *v -= velocity_mean);

    let position = cumulative(velocity.iter().zip(dt).map(|(v, dt)| v * dt));

    AxisTrace {
        position,
        bias,
        velocity_mean,
    }
}

fn cumulative(steps: impl Iterator<Item = f64>) -> Vec<f64> {
    steps
        .scan(0.0, |acc, step| {
            *acc += step;
            Some(*acc)
        })
        .collect()
}

/// Median; mean of the two middle values for an even count
fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
