//! 会话指标收集模块
//!
//! 为实时管道记录 Prometheus 指标，并在内存中聚合会话结束时的统计摘要。

use contracts::Sample;
use metrics::{counter, gauge, histogram};

/// 记录一个分发给 sinks 的样本
pub fn record_sample_dispatched(sample: &Sample) {
    counter!("liftlog_samples_dispatched_total").increment(1);
    gauge!("liftlog_last_seq").set(sample.seq as f64);
    histogram!("liftlog_gyro_magnitude_dps").record(sample.gyro_magnitude());
}

/// 记录 sink 写入结果
pub fn record_sink_write(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "liftlog_sink_writes_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 记录实时缓冲区深度
pub fn record_live_buffer_depth(depth: usize) {
    gauge!("liftlog_live_buffer_depth").set(depth as f64);
}

/// 记录由序列号推断出的设备丢包
pub fn record_sequence_gap(missing: u64) {
    counter!("liftlog_sequence_gaps_total").increment(1);
    counter!("liftlog_packets_missing_total").increment(missing);
}

/// 记录一次动作分段的结果
pub fn record_reps_detected(count: usize) {
    counter!("liftlog_reps_detected_total").increment(count as u64);
}

/// 会话统计聚合器
///
/// 在内存中聚合一次录制的逐样本统计，便于输出摘要。
#[derive(Debug, Clone, Default)]
pub struct SessionStatsAggregator {
    /// 样本总数
    pub total_samples: u64,

    /// 序列号向前跳变次数
    pub sequence_gaps: u64,

    /// 跳变推断出的丢包数
    pub missing_packets: u64,

    /// 序列号回退次数 (重置或乱序)
    pub sequence_regressions: u64,

    /// 到达间隔统计 (毫秒)
    pub interval_stats: RunningStats,

    /// 角速度模长统计 (deg/s)
    pub gyro_stats: RunningStats,

    last_seq: Option<u16>,
    last_timestamp: Option<f64>,
}

impl SessionStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新统计
    pub fn update(&mut self, sample: &Sample) {
        self.total_samples += 1;

        if let Some(prev) = self.last_seq {
            let expected = prev.wrapping_add(1);
            if sample.seq != expected {
                // u16 环上的前向距离；超过半环视为回退
                let ahead = sample.seq.wrapping_sub(expected);
                if ahead < 0x8000 {
                    self.sequence_gaps += 1;
                    self.missing_packets += ahead as u64;
                    record_sequence_gap(ahead as u64);
                } else {
                    self.sequence_regressions += 1;
                }
            }
        }
        self.last_seq = Some(sample.seq);

        if let Some(prev) = self.last_timestamp {
            self.interval_stats.push((sample.timestamp - prev) * 1000.0);
        }
        self.last_timestamp = Some(sample.timestamp);

        self.gyro_stats.push(sample.gyro_magnitude());
    }

    /// 生成摘要报告
    pub fn summary(&self) -> SessionSummary {
        let expected = self.total_samples + self.missing_packets;
        SessionSummary {
            total_samples: self.total_samples,
            sequence_gaps: self.sequence_gaps,
            missing_packets: self.missing_packets,
            sequence_regressions: self.sequence_regressions,
            loss_rate: if expected > 0 {
                self.missing_packets as f64 / expected as f64 * 100.0
            } else {
                0.0
            },
            interval_ms: StatsSummary::from(&self.interval_stats),
            gyro_magnitude: StatsSummary::from(&self.gyro_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 会话摘要
#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
    pub total_samples: u64,
    pub sequence_gaps: u64,
    pub missing_packets: u64,
    pub sequence_regressions: u64,
    pub loss_rate: f64,
    pub interval_ms: StatsSummary,
    pub gyro_magnitude: StatsSummary,
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Session Summary ===")?;
        writeln!(f, "Samples: {}", self.total_samples)?;
        writeln!(
            f,
            "Missing packets: {} in {} gaps ({:.2}%)",
            self.missing_packets, self.sequence_gaps, self.loss_rate
        )?;
        writeln!(f, "Sequence regressions: {}", self.sequence_regressions)?;
        writeln!(f, "Inter-arrival (ms): {}", self.interval_ms)?;
        writeln!(f, "Gyro magnitude (deg/s): {}", self.gyro_magnitude)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计 (Welford 算法)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加一个值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
