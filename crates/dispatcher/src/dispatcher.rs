//! Dispatcher - drains decoded samples into live buffers and sinks

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::{Sample, SinkConfig, SinkType};
use observability::{SessionStatsAggregator, SessionSummary};

use crate::buffer::LiveBuffers;
use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::MetricsSnapshot;
use crate::sinks::{CsvLogSink, LogSink};

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    sinks: Vec<SinkConfig>,
    input_rx: async_channel::Receiver<Sample>,
    live: Option<Arc<LiveBuffers>>,
}

impl DispatcherBuilder {
    pub fn new(sinks: Vec<SinkConfig>, input_rx: async_channel::Receiver<Sample>) -> Self {
        Self {
            sinks,
            input_rx,
            live: None,
        }
    }

    /// Feed the given live buffers inline, ahead of the sinks
    pub fn with_live_buffers(mut self, live: Arc<LiveBuffers>) -> Self {
        self.live = Some(live);
        self
    }

    /// Open every sink and spawn its worker
    #[instrument(name = "dispatcher_builder_build", skip(self), fields(sink_count = self.sinks.len()))]
    pub async fn build(self) -> Result<Dispatcher, DispatcherError> {
        let mut handles = Vec::with_capacity(self.sinks.len());
        for sink_config in &self.sinks {
            handles.push(create_sink_handle(sink_config)?);
        }

        let mut dispatcher = Dispatcher::with_handles(handles, self.input_rx);
        dispatcher.live = self.live;
        Ok(dispatcher)
    }
}

#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    match config.sink_type {
        SinkType::Log => Ok(SinkHandle::spawn(
            LogSink::new(&config.name),
            config.queue_capacity,
        )),
        SinkType::Csv => {
            let sink = CsvLogSink::from_params(&config.name, &config.params)?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
    }
}

/// Outcome of a dispatcher run
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// Samples drained from the input channel
    pub samples: u64,
    pub sinks: Vec<(String, MetricsSnapshot)>,
    pub session: SessionSummary,
}

/// Fans decoded samples out to every sink, in arrival order
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: async_channel::Receiver<Sample>,
    live: Option<Arc<LiveBuffers>>,
    stats: SessionStatsAggregator,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles
    pub fn with_handles(
        handles: Vec<SinkHandle>,
        input_rx: async_channel::Receiver<Sample>,
    ) -> Self {
        Self {
            handles,
            input_rx,
            live: None,
            stats: SessionStatsAggregator::new(),
        }
    }

    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Run until the input channel is closed and drained
    ///
    /// Sinks are flushed and closed before returning.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) -> DispatchReport {
        info!(sinks = self.handles.len(), "Dispatcher started");

        let mut samples: u64 = 0;

        while let Ok(sample) = self.input_rx.recv().await {
            samples += 1;
            self.dispatch_sample(&sample).await;

            if samples % 500 == 0 {
                debug!(samples, "Dispatcher progress");
            }
        }

        info!(samples, "Dispatcher input closed, shutting down");

        let counters: Vec<_> = self
            .handles
            .iter()
            .map(|h| (h.name().to_string(), Arc::clone(h.metrics())))
            .collect();
        for handle in self.handles {
            handle.shutdown().await;
        }
        // Worker counters are final only after shutdown
        let sinks = counters
            .into_iter()
            .map(|(name, metrics)| (name, metrics.snapshot()))
            .collect();

        DispatchReport {
            samples,
            sinks,
            session: self.stats.summary(),
        }
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<DispatchReport> {
        tokio::spawn(self.run())
    }

    async fn dispatch_sample(&mut self, sample: &Sample) {
        if let Some(live) = &self.live {
            live.push(sample);
            observability::record_live_buffer_depth(live.len());
        }
        self.stats.update(sample);
        observability::record_sample_dispatched(sample);

        for handle in &self.handles {
            handle.send(*sample).await;
        }
    }
}

/// Create a dispatcher from sink configs
pub async fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    input_rx: async_channel::Receiver<Sample>,
) -> Result<Dispatcher, DispatcherError> {
    DispatcherBuilder::new(sink_configs, input_rx).build().await
}
