//! Offline analysis outputs

use serde::{Deserialize, Serialize};

/// One detected repetition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rep {
    /// 1-based ordinal, dense in emission order
    pub index: usize,

    /// Time of the start-threshold crossing (seconds)
    pub start_time: f64,

    /// Time of the stop-threshold crossing (seconds)
    pub end_time: f64,
}

impl Rep {
    /// `end_time - start_time`
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// One point of the estimated 2D displacement trace
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    /// Log timestamp (seconds)
    pub time: f64,

    /// Horizontal displacement (g·s², unscaled)
    pub position_x: f64,

    /// Vertical displacement (g·s², unscaled)
    pub position_z: f64,
}
