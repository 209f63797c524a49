//! Sample - PacketDecoder output
//!
//! One decoded telemetry packet from the wearable IMU.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Decoded motion sample
///
/// Produced exactly once per valid inbound packet and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Host receipt time (seconds, monotonic clock)
    pub timestamp: f64,

    /// Device sequence counter
    pub seq: u16,

    /// Linear acceleration (g)
    pub ax: f64,
    pub ay: f64,
    pub az: f64,

    /// Angular rate (deg/s)
    pub gx: f64,
    pub gy: f64,
    pub gz: f64,
}

impl Sample {
    /// Value of a single field, `seq` widened to f64
    pub fn field(&self, field: SampleField) -> f64 {
        match field {
            SampleField::Seq => self.seq as f64,
            SampleField::Ax => self.ax,
            SampleField::Ay => self.ay,
            SampleField::Az => self.az,
            SampleField::Gx => self.gx,
            SampleField::Gy => self.gy,
            SampleField::Gz => self.gz,
        }
    }

    /// Angular-rate magnitude (deg/s)
    pub fn gyro_magnitude(&self) -> f64 {
        (self.gx * self.gx + self.gy * self.gy + self.gz * self.gz).sqrt()
    }
}

/// Named fields of a [`Sample`] that a decode layout can populate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleField {
    Seq,
    Ax,
    Ay,
    Az,
    Gx,
    Gy,
    Gz,
}

impl SampleField {
    /// All fields in durable-log column order
    pub const ALL: [SampleField; 7] = [
        SampleField::Seq,
        SampleField::Ax,
        SampleField::Ay,
        SampleField::Az,
        SampleField::Gx,
        SampleField::Gy,
        SampleField::Gz,
    ];

    /// Acceleration and angular-rate channels shown on the live display
    pub const CHANNELS: [SampleField; 6] = [
        SampleField::Ax,
        SampleField::Ay,
        SampleField::Az,
        SampleField::Gx,
        SampleField::Gy,
        SampleField::Gz,
    ];

    /// Column name in the durable log
    pub fn column(self) -> &'static str {
        match self {
            SampleField::Seq => "seq",
            SampleField::Ax => "ax",
            SampleField::Ay => "ay",
            SampleField::Az => "az",
            SampleField::Gx => "gx",
            SampleField::Gy => "gy",
            SampleField::Gz => "gz",
        }
    }
}

impl fmt::Display for SampleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Header of the durable sample log, in column order
pub const LOG_HEADER: [&str; 8] = ["t_s", "seq", "ax", "ay", "az", "gx", "gy", "gz"];
