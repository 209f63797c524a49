//! Notification handler
//!
//! The boundary between the transport's delivery context and the sample
//! pipeline. Its only work per notification is stamp, decode and forward;
//! it never blocks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_channel::{Sender, TrySendError};
use bytes::Bytes;
use contracts::{LinkEvent, NotificationCallback, Sample};
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::clock::MonotonicClock;
use crate::config::IngestionMetrics;
use crate::decoder::PacketDecoder;

/// Decode-and-forward handler for one notification stream
pub struct NotificationHandler {
    decoder: Arc<PacketDecoder>,
    tx: Sender<Sample>,
    metrics: Arc<IngestionMetrics>,
    streaming: AtomicBool,
    clock: MonotonicClock,
    events: Option<broadcast::Sender<LinkEvent>>,
}

impl NotificationHandler {
    pub fn new(
        decoder: Arc<PacketDecoder>,
        tx: Sender<Sample>,
        metrics: Arc<IngestionMetrics>,
    ) -> Self {
        Self {
            decoder,
            tx,
            metrics,
            streaming: AtomicBool::new(false),
            clock: MonotonicClock::new(),
            events: None,
        }
    }

    /// Report decode failures as [`LinkEvent::DecodeError`] on `events`
    pub fn with_events(mut self, events: broadcast::Sender<LinkEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Use an explicit receipt clock (shared origin with other components)
    pub fn with_clock(mut self, clock: MonotonicClock) -> Self {
        self.clock = clock;
        self
    }

    /// Start accepting notifications; returns false if already active
    pub fn activate(&self) -> bool {
        let was = self.streaming.swap(true, Ordering::SeqCst);
        if !was {
            debug!("notification handler activated");
        }
        !was
    }

    /// Stop accepting notifications; returns false if already inactive
    pub fn deactivate(&self) -> bool {
        let was = self.streaming.swap(false, Ordering::SeqCst);
        if was {
            debug!("notification handler deactivated");
        }
        was
    }

    pub fn is_active(&self) -> bool {
        self.streaming.load(Ordering::Relaxed)
    }

    pub fn metrics(&self) -> &Arc<IngestionMetrics> {
        &self.metrics
    }

    /// Callback to hand to [`Transport::subscribe`](contracts::Transport::subscribe)
    pub fn callback(self: &Arc<Self>) -> NotificationCallback {
        let handler = Arc::clone(self);
        Arc::new(move |payload: Bytes| handler.handle(&payload))
    }

    /// Process one notification payload
    pub fn handle(&self, payload: &[u8]) {
        if !self.streaming.load(Ordering::Relaxed) {
            // Late delivery after stop
            self.metrics.record_ignored();
            return;
        }

        self.metrics.record_received();
        let timestamp = self.clock.now();

        let sample = match self.decoder.decode(payload, timestamp) {
            Ok(sample) => sample,
            Err(e) => {
                self.metrics.record_decode_error();
                warn!(len = payload.len(), error = %e, "decode error");
                if let Some(events) = &self.events {
                    // No subscribers is fine
                    let _ = events.send(LinkEvent::DecodeError {
                        len: payload.len(),
                        message: e.to_string(),
                    });
                }
                return;
            }
        };
        self.metrics.record_decoded();

        match self.tx.try_send(sample) {
            Ok(()) => {
                trace!(seq = sample.seq, "sample forwarded");
            }
            Err(TrySendError::Full(_)) => {
                self.metrics.record_dropped();
                trace!(seq = sample.seq, "sample dropped (channel full)");
            }
            Err(TrySendError::Closed(_)) => {
                self.metrics.record_dropped();
                warn!("sample channel closed");
            }
        }
    }

    /// Close the sample channel so the consumer can drain and exit
    pub fn close(&self) {
        self.deactivate();
        self.tx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_channel::bounded;
    use contracts::DecodeLayout;

    fn handler(capacity: usize) -> (Arc<NotificationHandler>, async_channel::Receiver<Sample>) {
        let decoder = Arc::new(PacketDecoder::new(&DecodeLayout::default()).unwrap());
        let (tx, rx) = bounded(capacity);
        let handler = NotificationHandler::new(decoder, tx, Arc::new(IngestionMetrics::new()));
        (Arc::new(handler), rx)
    }

    fn payload(seq: u16) -> Bytes {
        let mut out = seq.to_le_bytes().to_vec();
        out.extend_from_slice(&[0u8; 12]);
        Bytes::from(out)
    }

    #[test]
    fn test_inactive_handler_ignores_packets() {
        let (handler, rx) = handler(8);
        handler.callback()(payload(1));

        assert!(rx.try_recv().is_err());
        assert_eq!(handler.metrics().snapshot().packets_ignored, 1);
        assert_eq!(handler.metrics().snapshot().packets_received, 0);
    }

    #[test]
    fn test_forwards_in_order() {
        let (handler, rx) = handler(8);
        assert!(handler.activate());
        assert!(!handler.activate());

        let callback = handler.callback();
        for seq in 0..5 {
            callback(payload(seq));
        }

        let seqs: Vec<u16> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|s| s.seq)
            .collect();
        assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_timestamps_non_decreasing() {
        let (handler, rx) = handler(64);
        handler.activate();
        for seq in 0..50 {
            handler.handle(&payload(seq));
        }
        let times: Vec<f64> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|s| s.timestamp)
            .collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_decode_error_does_not_stop_stream() {
        let (tx_events, mut rx_events) = broadcast::channel(8);
        let decoder = Arc::new(PacketDecoder::new(&DecodeLayout::default()).unwrap());
        let (tx, rx) = bounded(8);
        let handler = Arc::new(
            NotificationHandler::new(decoder, tx, Arc::new(IngestionMetrics::new()))
                .with_events(tx_events),
        );
        handler.activate();

        handler.handle(&payload(1));
        handler.handle(&[0x01, 0x02, 0x03]);
        handler.handle(&payload(2));

        assert_eq!(rx.try_recv().unwrap().seq, 1);
        assert_eq!(rx.try_recv().unwrap().seq, 2);

        match rx_events.try_recv().unwrap() {
            LinkEvent::DecodeError { len, message } => {
                assert_eq!(len, 3);
                assert!(message.contains("malformed packet"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(handler.metrics().snapshot().decode_errors, 1);
    }

    #[test]
    fn test_full_channel_drops_newest() {
        let (handler, rx) = handler(2);
        handler.activate();
        for seq in 0..4 {
            handler.handle(&payload(seq));
        }

        assert_eq!(rx.try_recv().unwrap().seq, 0);
        assert_eq!(rx.try_recv().unwrap().seq, 1);
        assert!(rx.try_recv().is_err());
        assert_eq!(handler.metrics().snapshot().samples_dropped, 2);
    }

    #[test]
    fn test_close_ends_channel() {
        let (handler, rx) = handler(4);
        handler.activate();
        handler.handle(&payload(9));
        handler.close();

        assert!(!handler.is_active());
        assert_eq!(rx.try_recv().unwrap().seq, 9);
        assert!(rx.try_recv().is_err());
        assert!(rx.is_closed());
    }
}
