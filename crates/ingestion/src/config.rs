//! Ingestion metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Ingestion metrics
///
/// Updated from the notification delivery context, read by the session summary.
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Notifications handed to the handler while streaming
    pub packets_received: AtomicU64,

    /// Samples decoded successfully
    pub samples_decoded: AtomicU64,

    /// Payloads rejected by the decoder
    pub decode_errors: AtomicU64,

    /// Samples dropped because the channel was full
    pub samples_dropped: AtomicU64,

    /// Notifications ignored because streaming was off
    pub packets_ignored: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("liftlog_packets_received_total").increment(1);
    }

    pub fn record_decoded(&self) {
        self.samples_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("liftlog_decode_errors_total").increment(1);
    }

    pub fn record_dropped(&self) {
        self.samples_dropped.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("liftlog_samples_dropped_total").increment(1);
    }

    pub fn record_ignored(&self) {
        self.packets_ignored.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            samples_decoded: self.samples_decoded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            samples_dropped: self.samples_dropped.load(Ordering::Relaxed),
            packets_ignored: self.packets_ignored.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub packets_received: u64,
    pub samples_decoded: u64,
    pub decode_errors: u64,
    pub samples_dropped: u64,
    pub packets_ignored: u64,
}
