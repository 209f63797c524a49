//! SessionConfig - Config Loader output
//!
//! Describes a complete acquisition/analysis session: link addressing,
//! decode layout, rep detection parameters, live buffering and output routing.
//! Constructed once at startup and threaded through every component.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::{CharacteristicUuid, DecodeLayout};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete session configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Radio link settings
    #[serde(default)]
    pub link: LinkConfig,

    /// Packet layout
    #[serde(default)]
    pub decode: DecodeLayout,

    /// Rep segmentation parameters
    #[serde(default)]
    pub reps: RepDetectionConfig,

    /// Trajectory estimation parameters
    #[serde(default)]
    pub trajectory: TrajectoryConfig,

    /// Live display buffering
    #[serde(default)]
    pub live: LiveConfig,

    /// Durable log and report locations
    #[serde(default)]
    pub recording: RecordingConfig,

    /// Additional sinks (the durable CSV log is always present)
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// Radio link settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Peripheral address
    #[serde(default = "default_address")]
    pub address: String,

    /// Characteristic that pushes telemetry
    #[serde(default = "default_notify_characteristic")]
    pub notify_characteristic: CharacteristicUuid,

    /// Characteristic that accepts opcodes
    #[serde(default = "default_write_characteristic")]
    pub write_characteristic: CharacteristicUuid,

    /// Upper bound on link establishment (seconds)
    #[serde(default = "default_connect_timeout_s")]
    pub connect_timeout_s: f64,

    /// Wait before re-reading an empty service list (milliseconds)
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

fn default_address() -> String {
    "E2:89:6D:EC:FB:97".to_string()
}

fn default_notify_characteristic() -> CharacteristicUuid {
    "12345678-1234-1234-1234-1234567890AC".into()
}

fn default_write_characteristic() -> CharacteristicUuid {
    "12345678-1234-1234-1234-1234567890AD".into()
}

fn default_connect_timeout_s() -> f64 {
    20.0
}

fn default_settle_delay_ms() -> u64 {
    500
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            notify_characteristic: default_notify_characteristic(),
            write_characteristic: default_write_characteristic(),
            connect_timeout_s: default_connect_timeout_s(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl LinkConfig {
    /// Connect timeout; falls back to the default for unrepresentable values
    pub fn connect_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.connect_timeout_s)
            .unwrap_or_else(|_| Duration::from_secs_f64(default_connect_timeout_s()))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Hysteresis rep detection parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepDetectionConfig {
    /// Enter a rep when gmag rises above this (deg/s)
    #[serde(default = "default_start_threshold", alias = "START_THRESHOLD")]
    pub start_threshold: f64,

    /// Leave a rep when gmag falls below this (deg/s)
    #[serde(default = "default_stop_threshold", alias = "STOP_THRESHOLD")]
    pub stop_threshold: f64,

    /// Shorter candidates are discarded (seconds)
    #[serde(default = "default_min_rep_duration", alias = "MIN_REP_DURATION")]
    pub min_rep_duration: f64,
}

fn default_start_threshold() -> f64 {
    12.0
}

fn default_stop_threshold() -> f64 {
    6.0
}

fn default_min_rep_duration() -> f64 {
    0.8
}

impl Default for RepDetectionConfig {
    fn default() -> Self {
        Self {
            start_threshold: default_start_threshold(),
            stop_threshold: default_stop_threshold(),
            min_rep_duration: default_min_rep_duration(),
        }
    }
}

/// Trajectory estimation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryConfig {
    /// Longer traces are flagged as unreliable (seconds)
    #[serde(default = "default_max_window_s")]
    pub max_window_s: f64,
}

fn default_max_window_s() -> f64 {
    30.0
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            max_window_s: default_max_window_s(),
        }
    }
}

/// Live display buffering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Rolling buffer capacity per channel
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Bounded notification -> sink channel capacity
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_buffer_capacity() -> usize {
    300
}

fn default_channel_capacity() -> usize {
    1024
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Durable log and report locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Durable sample log
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,

    /// Directory for analysis reports
    #[serde(default = "default_analysis_dir")]
    pub analysis_dir: PathBuf,
}

fn default_log_path() -> PathBuf {
    PathBuf::from("ble_decoded.csv")
}

fn default_analysis_dir() -> PathBuf {
    PathBuf::from("sets")
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            analysis_dir: default_analysis_dir(),
        }
    }
}

impl RecordingConfig {
    /// Default rep report location
    pub fn rep_report_path(&self) -> PathBuf {
        self.analysis_dir.join("ble_decoded_analysis.csv")
    }

    /// Default trajectory report location
    pub fn trajectory_report_path(&self) -> PathBuf {
        self.analysis_dir.join("ble_decoded_trajectory.csv")
    }
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    256
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Tracing summary output
    Log,
    /// Append-only CSV sample log
    Csv,
}

impl SessionConfig {
    /// Sink list with the durable log first
    pub fn all_sinks(&self) -> Vec<SinkConfig> {
        let mut sinks = Vec::with_capacity(self.sinks.len() + 1);
        sinks.push(self.durable_log_sink());
        sinks.extend(self.sinks.iter().cloned());
        sinks
    }

    /// Durable CSV log sink derived from `recording.log_path`
    pub fn durable_log_sink(&self) -> SinkConfig {
        SinkConfig {
            name: DURABLE_LOG_SINK.to_string(),
            sink_type: SinkType::Csv,
            queue_capacity: self.live.channel_capacity,
            params: HashMap::from([(
                "path".to_string(),
                self.recording.log_path.display().to_string(),
            )]),
        }
    }
}

/// Reserved name of the always-present durable log sink
pub const DURABLE_LOG_SINK: &str = "durable_log";
