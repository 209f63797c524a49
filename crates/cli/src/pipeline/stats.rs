//! Recording statistics.

use std::time::Duration;

use contracts::ConnectionState;
use dispatcher::{DispatchReport, LiveSnapshot};
use ingestion::MetricsSnapshot;

use super::StopReason;

/// Statistics from one recording
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Wall time from setup to teardown
    pub duration: Duration,

    pub stop_reason: StopReason,

    /// Lifecycle state after teardown
    pub final_state: ConnectionState,

    /// Notification-side counters
    pub ingestion: MetricsSnapshot,

    /// Final contents of the live view
    pub live: LiveSnapshot,

    /// Sink-side counters and session summary
    pub dispatch: DispatchReport,
}

impl PipelineStats {
    /// Samples per second over the whole run
    pub fn sample_rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.dispatch.samples as f64 / secs
        } else {
            0.0
        }
    }

    /// Share of received packets that never reached the sinks (%)
    pub fn drop_rate(&self) -> f64 {
        let received = self.ingestion.packets_received;
        if received == 0 {
            return 0.0;
        }
        let lost = self.ingestion.decode_errors + self.ingestion.samples_dropped;
        lost as f64 / received as f64 * 100.0
    }

    pub fn print_summary(&self) {
        println!();
        println!("Recording stopped ({:?}) after {:.2}s", self.stop_reason, self.duration.as_secs_f64());
        println!("  Samples: {} ({:.1} Hz)", self.dispatch.samples, self.sample_rate());
        println!(
            "  Packets: {} received, {} decode errors, {} dropped, {} ignored ({:.2}% lost)",
            self.ingestion.packets_received,
            self.ingestion.decode_errors,
            self.ingestion.samples_dropped,
            self.ingestion.packets_ignored,
            self.drop_rate()
        );
        println!("  Link: {}", self.final_state);

        println!("\nSinks");
        for (name, snapshot) in &self.dispatch.sinks {
            println!(
                "  - {}: {} written, {} failed",
                name, snapshot.written, snapshot.failed
            );
        }

        if let Some(latest) = self.live.latest {
            println!(
                "\nLast sample: seq={} ax={:.3} ay={:.3} az={:.3} gx={:.2} gy={:.2} gz={:.2}",
                latest.seq, latest.ax, latest.ay, latest.az, latest.gx, latest.gy, latest.gz
            );
        }

        println!("\n{}", self.dispatch.session);
    }
}
