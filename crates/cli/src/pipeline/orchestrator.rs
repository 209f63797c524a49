//! Recording pipeline orchestrator - wires the live components together.
//!
//! Device session flow: connect, optionally reset the counter, send START,
//! subscribe; on stop send STOP, then disconnect (which unsubscribes first).
//! The dispatcher drains whatever the handler forwarded before the report
//! is built.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{LinkEvent, Opcode, SessionConfig, Transport};
use dispatcher::{DispatcherBuilder, LiveBuffers, LiveSnapshot};
use ingestion::{IngestionMetrics, NotificationHandler, PacketDecoder};
use link::{ConnectionLifecycle, EVENT_CAPACITY};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::PipelineStats;

/// How often the live view is refreshed
const RENDER_INTERVAL: Duration = Duration::from_secs(1);

/// Recording configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated session configuration
    pub session: SessionConfig,

    /// Stop after this long (None = until shutdown)
    pub duration: Option<Duration>,

    /// Stop after this many samples (None = unlimited)
    pub max_samples: Option<u64>,

    /// Send RESET_SEQ before START
    pub reset_seq: bool,
}

/// Why the recording ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Duration,
    MaxSamples,
    Shutdown,
}

/// Main recording orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Record until the duration, sample limit or `shutdown` fires
    pub async fn run<T, F>(self, transport: T, shutdown: F) -> Result<PipelineStats>
    where
        T: Transport,
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let session = &self.config.session;

        // Decode boundary
        let decoder =
            Arc::new(PacketDecoder::new(&session.decode).context("Invalid decode layout")?);
        let (sample_tx, sample_rx) = async_channel::bounded(session.live.channel_capacity);
        let (events_tx, events_rx) = broadcast::channel(EVENT_CAPACITY);
        let ingestion_metrics = Arc::new(IngestionMetrics::new());
        let handler = Arc::new(
            NotificationHandler::new(decoder, sample_tx, Arc::clone(&ingestion_metrics))
                .with_events(events_tx.clone()),
        );

        // Consumer side
        let live = Arc::new(LiveBuffers::new(session.live.buffer_capacity));
        let sinks = session.all_sinks();
        info!(
            log = %session.recording.log_path.display(),
            sinks = sinks.len(),
            "Setting up dispatcher"
        );
        let dispatcher = DispatcherBuilder::new(sinks, sample_rx)
            .with_live_buffers(Arc::clone(&live))
            .build()
            .await
            .context("Failed to create dispatcher")?;
        let dispatcher_handle = dispatcher.spawn();
        let status_handle = spawn_status_listener(events_rx);

        // Link
        let mut lifecycle = ConnectionLifecycle::new(
            transport,
            session.link.clone(),
            Arc::clone(&handler),
        )
        .with_events(events_tx);

        let outcome = self.drive(&mut lifecycle, &live, shutdown).await;

        // Teardown runs whatever happened above
        if let Err(e) = lifecycle.disconnect().await {
            warn!(error = %e, "Disconnect failed");
        }
        let final_state = lifecycle.state();
        drop(lifecycle);
        handler.close();
        drop(handler);

        let dispatch = dispatcher_handle
            .await
            .context("Dispatcher task failed")?;
        status_handle.abort();

        let stop_reason = outcome?;
        let stats = PipelineStats {
            duration: start_time.elapsed(),
            stop_reason,
            final_state,
            ingestion: ingestion_metrics.snapshot(),
            live: live.snapshot(),
            dispatch,
        };

        info!(
            samples = stats.dispatch.samples,
            duration_secs = stats.duration.as_secs_f64(),
            rate_hz = format!("{:.1}", stats.sample_rate()),
            "Recording complete"
        );
        Ok(stats)
    }

    async fn drive<T, F>(
        &self,
        lifecycle: &mut ConnectionLifecycle<T>,
        live: &LiveBuffers,
        shutdown: F,
    ) -> Result<StopReason>
    where
        T: Transport,
        F: Future<Output = ()>,
    {
        lifecycle.connect().await.context("Failed to connect")?;
        if self.config.reset_seq {
            lifecycle
                .send_command(Opcode::ResetSeq)
                .await
                .context("Failed to reset sequence counter")?;
        }
        lifecycle
            .send_command(Opcode::Start)
            .await
            .context("Failed to start device streaming")?;
        lifecycle
            .start_streaming()
            .await
            .context("Failed to enable notifications")?;

        let reason = self.wait_for_stop(live, shutdown).await;
        info!(reason = ?reason, "Stopping recording");

        lifecycle
            .send_command(Opcode::Stop)
            .await
            .context("Failed to stop device streaming")?;
        Ok(reason)
    }

    async fn wait_for_stop<F: Future<Output = ()>>(
        &self,
        live: &LiveBuffers,
        shutdown: F,
    ) -> StopReason {
        let deadline = async {
            match self.config.duration {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending().await,
            }
        };
        let sample_limit = async {
            let mut ticker = tokio::time::interval(Duration::from_millis(20));
            let mut last_render = Instant::now();
            loop {
                ticker.tick().await;
                let snapshot = live.snapshot();
                if last_render.elapsed() >= RENDER_INTERVAL {
                    render(&snapshot);
                    last_render = Instant::now();
                }
                if let Some(max) = self.config.max_samples {
                    if snapshot.total_samples >= max {
                        return;
                    }
                }
            }
        };

        tokio::pin!(shutdown, deadline, sample_limit);
        tokio::select! {
            _ = &mut shutdown => StopReason::Shutdown,
            _ = &mut deadline => StopReason::Duration,
            _ = &mut sample_limit => StopReason::MaxSamples,
        }
    }
}

/// Live view: the latest field/value table and the window fill
fn render(snapshot: &LiveSnapshot) {
    let Some(latest) = snapshot.latest else {
        debug!("No samples yet");
        return;
    };
    info!(
        samples = snapshot.total_samples,
        window = snapshot.time.len(),
        seq = latest.seq,
        ax = format!("{:.3}", latest.ax),
        ay = format!("{:.3}", latest.ay),
        az = format!("{:.3}", latest.az),
        gx = format!("{:.2}", latest.gx),
        gy = format!("{:.2}", latest.gy),
        gz = format!("{:.2}", latest.gz),
        "Live"
    );
}

/// Log status observations until the channel closes
fn spawn_status_listener(mut events: broadcast::Receiver<LinkEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(LinkEvent::Status { state, message }) => {
                    info!(state = %state, "{message}");
                }
                Ok(LinkEvent::Connectivity(connected)) => {
                    info!(connected, "Connectivity changed");
                }
                Ok(LinkEvent::DecodeError { len, message }) => {
                    warn!(len, "Decode error: {message} (len={len})");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Status listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
