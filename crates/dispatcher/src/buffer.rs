//! Live display buffers
//!
//! One fixed-capacity ring per motion channel. When full, the oldest value
//! is overwritten, so a buffer never holds more than its capacity and always
//! holds the most recent values in arrival order.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{Sample, SampleField};
use ringbuf::{traits::*, HeapRb};

/// Bounded FIFO that evicts oldest-first
pub struct RollingBuffer<T> {
    ring: HeapRb<T>,
    capacity: usize,
    evicted: u64,
}

impl<T> fmt::Debug for RollingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollingBuffer")
            .field("len", &self.ring.occupied_len())
            .field("capacity", &self.capacity)
            .field("evicted", &self.evicted)
            .finish()
    }
}

impl<T: Copy> RollingBuffer<T> {
    /// Create a buffer holding at most `capacity` values (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ring: HeapRb::new(capacity),
            capacity,
            evicted: 0,
        }
    }

    /// Append, evicting the oldest value when full
    #[inline]
    pub fn push(&mut self, value: T) {
        if self.ring.push_overwrite(value).is_some() {
            self.evicted += 1;
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ring.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Values overwritten so far
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Contents, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.ring.iter().copied().collect()
    }
}

/// Copy of the live buffers handed to a renderer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveSnapshot {
    /// Receipt times, aligned with every channel
    pub time: Vec<f64>,
    /// One series per motion channel, in [`SampleField::CHANNELS`] order
    pub channels: [Vec<f64>; 6],
    /// Most recent sample (field/value table)
    pub latest: Option<Sample>,
    /// Samples pushed since creation
    pub total_samples: u64,
}

impl LiveSnapshot {
    /// Series for one channel; `seq` has no live series
    pub fn channel(&self, field: SampleField) -> Option<&[f64]> {
        SampleField::CHANNELS
            .iter()
            .position(|c| *c == field)
            .map(|idx| self.channels[idx].as_slice())
    }
}

struct LiveState {
    time: RollingBuffer<f64>,
    channels: [RollingBuffer<f64>; 6],
    latest: Option<Sample>,
    total_samples: u64,
}

/// Per-channel rolling buffers shared between the dispatcher and renderers
///
/// Only the dispatcher writes; readers take a [`LiveSnapshot`].
pub struct LiveBuffers {
    capacity: usize,
    state: Mutex<LiveState>,
}

impl LiveBuffers {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(LiveState {
                time: RollingBuffer::new(capacity),
                channels: std::array::from_fn(|_| RollingBuffer::new(capacity)),
                latest: None,
                total_samples: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LiveState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append one sample to every channel
    pub fn push(&self, sample: &Sample) {
        let mut state = self.lock();
        state.time.push(sample.timestamp);
        for (buffer, field) in state.channels.iter_mut().zip(SampleField::CHANNELS) {
            buffer.push(sample.field(field));
        }
        state.latest = Some(*sample);
        state.total_samples += 1;
    }

    /// Current fill level (same for every channel)
    pub fn len(&self) -> usize {
        self.lock().time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> LiveSnapshot {
        let state = self.lock();
        LiveSnapshot {
            time: state.time.to_vec(),
            channels: std::array::from_fn(|idx| state.channels[idx].to_vec()),
            latest: state.latest,
            total_samples: state.total_samples,
        }
    }
}

impl fmt::Debug for LiveBuffers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveBuffers")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(seq: u16) -> Sample {
        let v = seq as f64;
        Sample {
            timestamp: v * 0.01,
            seq,
            ax: v,
            ay: -v,
            az: 1.0,
            gx: 10.0 * v,
            gy: 0.0,
            gz: 0.5,
        }
    }

    #[test]
    fn test_rolling_buffer_keeps_last_n() {
        let mut buffer = RollingBuffer::new(5);
        for v in 0..12 {
            buffer.push(v);
        }

        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.to_vec(), vec![7, 8, 9, 10, 11]);
        assert_eq!(buffer.evicted(), 7);
    }

    #[test]
    fn test_rolling_buffer_under_capacity() {
        let mut buffer = RollingBuffer::new(300);
        for v in 0..3 {
            buffer.push(v);
        }
        assert_eq!(buffer.to_vec(), vec![0, 1, 2]);
        assert_eq!(buffer.evicted(), 0);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut buffer = RollingBuffer::new(0);
        buffer.push(1.0);
        buffer.push(2.0);
        assert_eq!(buffer.to_vec(), vec![2.0]);
    }

    #[test]
    fn test_live_buffers_bound_and_order() {
        let live = LiveBuffers::new(4);
        for seq in 0..10 {
            live.push(&sample(seq));
        }

        let snap = live.snapshot();
        assert_eq!(live.len(), 4);
        assert_eq!(snap.total_samples, 10);
        assert_eq!(snap.channel(SampleField::Ax), Some(&[6.0, 7.0, 8.0, 9.0][..]));
        assert_eq!(snap.channel(SampleField::Gx), Some(&[60.0, 70.0, 80.0, 90.0][..]));
        assert_eq!(snap.channel(SampleField::Seq), None);
        assert_eq!(snap.time.len(), 4);
        assert_eq!(snap.latest.map(|s| s.seq), Some(9));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let live = LiveBuffers::new(3);
        live.push(&sample(1));
        let snap = live.snapshot();
        live.push(&sample(2));

        assert_eq!(snap.time.len(), 1);
        assert_eq!(live.snapshot().time.len(), 2);
    }
}
