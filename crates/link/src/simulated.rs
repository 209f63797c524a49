//! Simulated IMU peripheral
//!
//! A [`Transport`] that behaves like the wearable: it exposes the notify and
//! write characteristics, honours the device opcodes and, while subscribed
//! and started, pushes packets encoded with the session's layout from a
//! background thread. Lets the whole pipeline run without radio hardware.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use contracts::{
    CharacteristicUuid, ContractError, DecodeLayout, LinkConfig, NotificationCallback, Opcode,
    Sample, Transport,
};
use ingestion::PacketEncoder;
use tracing::{debug, instrument, trace};

use crate::error::Result;

/// Synthetic lifting motion
///
/// Each cycle is a lift of `active_s` seconds (angular rate rises and falls
/// as a half sine, vertical acceleration swings up then down) followed by
/// `rest_s` seconds of stillness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiftMotion {
    pub active_s: f64,
    pub rest_s: f64,
    /// Peak angular rate on the x axis (deg/s)
    pub peak_rate_dps: f64,
    /// Peak vertical dynamic acceleration (g)
    pub vertical_amplitude_g: f64,
}

impl Default for LiftMotion {
    fn default() -> Self {
        Self {
            active_s: 1.6,
            rest_s: 1.0,
            peak_rate_dps: 60.0,
            vertical_amplitude_g: 0.3,
        }
    }
}

impl LiftMotion {
    /// Sample of the motion at `t` seconds into the set
    pub fn sample_at(&self, t: f64, seq: u16) -> Sample {
        let period = self.active_s + self.rest_s;
        let phase = if period > 0.0 { t.rem_euclid(period) } else { 0.0 };

        let (rate, lift) = if phase < self.active_s && self.active_s > 0.0 {
            let u = phase / self.active_s;
            ((PI * u).sin(), (2.0 * PI * u).sin())
        } else {
            (0.0, 0.0)
        };

        Sample {
            timestamp: t,
            seq,
            ax: 0.05 * lift,
            ay: 0.0,
            az: 1.0 + self.vertical_amplitude_g * lift,
            gx: self.peak_rate_dps * rate,
            gy: 0.2 * self.peak_rate_dps * rate,
            gz: 0.0,
        }
    }
}

/// Simulated device settings
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    /// Notification rate (Hz)
    pub rate_hz: f64,
    pub motion: LiftMotion,
    /// Artificial link establishment delay
    pub connect_delay: Duration,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            rate_hz: 50.0,
            motion: LiftMotion::default(),
            connect_delay: Duration::from_millis(50),
        }
    }
}

struct Shared {
    connected: AtomicBool,
    device_streaming: AtomicBool,
    seq: AtomicU16,
    /// Bumped on every subscribe/unsubscribe; stale workers exit
    generation: AtomicU64,
    callback: Mutex<Option<NotificationCallback>>,
}

impl Shared {
    fn callback(&self) -> Option<NotificationCallback> {
        self.callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_callback(&self, callback: Option<NotificationCallback>) -> Option<NotificationCallback> {
        let mut slot = self.callback.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, callback)
    }
}

/// Simulated peripheral transport
pub struct SimulatedDevice {
    address: String,
    notify: CharacteristicUuid,
    write: CharacteristicUuid,
    config: SimulatedConfig,
    encoder: PacketEncoder,
    shared: Arc<Shared>,
}

impl SimulatedDevice {
    pub fn new(link: &LinkConfig, layout: &DecodeLayout, config: SimulatedConfig) -> Result<Self> {
        Ok(Self {
            address: link.address.clone(),
            notify: link.notify_characteristic.clone(),
            write: link.write_characteristic.clone(),
            config,
            encoder: PacketEncoder::new(layout)?,
            shared: Arc::new(Shared {
                connected: AtomicBool::new(false),
                device_streaming: AtomicBool::new(false),
                seq: AtomicU16::new(0),
                generation: AtomicU64::new(0),
                callback: Mutex::new(None),
            }),
        })
    }

    /// Whether the device has been told to START
    pub fn is_device_streaming(&self) -> bool {
        self.shared.device_streaming.load(Ordering::Relaxed)
    }

    fn spawn_worker(&self) {
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let shared = self.shared.clone();
        let encoder = self.encoder.clone();
        let motion = self.config.motion;
        let rate_hz = self.config.rate_hz;

        thread::spawn(move || run_device(shared, encoder, motion, rate_hz, generation));
    }

    fn retire_worker(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
    }
}

fn run_device(
    shared: Arc<Shared>,
    encoder: PacketEncoder,
    motion: LiftMotion,
    rate_hz: f64,
    generation: u64,
) {
    let interval = Duration::from_secs_f64(1.0 / rate_hz);
    let started = Instant::now();
    let mut ticks: u64 = 0;
    let mut emitted: u64 = 0;

    debug!(rate_hz, generation, "simulated device worker started");

    while shared.generation.load(Ordering::SeqCst) == generation
        && shared.connected.load(Ordering::SeqCst)
    {
        if shared.device_streaming.load(Ordering::SeqCst) {
            if let Some(callback) = shared.callback() {
                // Wraps at u16::MAX like the device counter
                let seq = shared.seq.fetch_add(1, Ordering::SeqCst);
                let sample = motion.sample_at(emitted as f64 / rate_hz, seq);
                callback(encoder.encode_sample(&sample));
                emitted += 1;
                trace!(seq, "simulated packet sent");
            }
        }

        ticks += 1;
        let due = started + interval.mul_f64(ticks as f64);
        if let Some(wait) = due.checked_duration_since(Instant::now()) {
            thread::sleep(wait);
        }
    }

    debug!(generation, emitted, "simulated device worker stopped");
}

impl Transport for SimulatedDevice {
    fn address(&self) -> &str {
        &self.address
    }

    #[instrument(name = "simulated_connect", skip(self), fields(address = %self.address))]
    async fn connect(&mut self) -> std::result::Result<(), ContractError> {
        tokio::time::sleep(self.config.connect_delay).await;
        self.shared.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&mut self) -> std::result::Result<(), ContractError> {
        self.shared.connected.store(false, Ordering::SeqCst);
        self.shared.device_streaming.store(false, Ordering::SeqCst);
        self.shared.set_callback(None);
        self.retire_worker();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    fn characteristics(&self) -> Vec<CharacteristicUuid> {
        if self.is_connected() {
            vec![self.notify.clone(), self.write.clone()]
        } else {
            Vec::new()
        }
    }

    async fn subscribe(
        &mut self,
        target: &CharacteristicUuid,
        callback: NotificationCallback,
    ) -> std::result::Result<(), ContractError> {
        if !self.is_connected() {
            return Err(ContractError::NotConnected);
        }
        if *target != self.notify {
            return Err(ContractError::transport(format!(
                "characteristic {target} does not notify"
            )));
        }
        self.shared.set_callback(Some(callback));
        self.spawn_worker();
        Ok(())
    }

    async fn unsubscribe(
        &mut self,
        target: &CharacteristicUuid,
    ) -> std::result::Result<(), ContractError> {
        if !self.is_connected() {
            return Err(ContractError::NotConnected);
        }
        if *target != self.notify || self.shared.set_callback(None).is_none() {
            return Err(ContractError::NotSubscribed {
                characteristic: target.to_string(),
            });
        }
        self.retire_worker();
        Ok(())
    }

    async fn write_with_response(
        &mut self,
        target: &CharacteristicUuid,
        data: &[u8],
    ) -> std::result::Result<(), ContractError> {
        if !self.is_connected() {
            return Err(ContractError::NotConnected);
        }
        if *target != self.write {
            return Err(ContractError::transport(format!(
                "characteristic {target} is not writable"
            )));
        }

        let opcode = match data {
            [code] => Opcode::from_code(*code).ok_or_else(|| {
                ContractError::transport(format!("unsupported opcode 0x{code:02X}"))
            })?,
            _ => {
                return Err(ContractError::transport(format!(
                    "expected a single-byte opcode, got {} bytes",
                    data.len()
                )))
            }
        };

        match opcode {
            Opcode::Start => self.shared.device_streaming.store(true, Ordering::SeqCst),
            Opcode::Stop => self.shared.device_streaming.store(false, Ordering::SeqCst),
            Opcode::ResetSeq => self.shared.seq.store(0, Ordering::SeqCst),
        }
        debug!(opcode = %opcode, "simulated device handled command");
        Ok(())
    }
}
