//! LogSink - traces samples for debugging

use contracts::{ContractError, Sample, SampleSink};
use tracing::{debug, info, instrument};

/// Sink that emits each sample as a debug event and a count on close
pub struct LogSink {
    name: String,
    count: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl SampleSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, sample: &Sample) -> Result<(), ContractError> {
        self.count += 1;
        debug!(
            sink = %self.name,
            t_s = sample.timestamp,
            seq = sample.seq,
            gmag = sample.gyro_magnitude(),
            "Sample received"
        );
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, samples = self.count, "LogSink closed");
        Ok(())
    }
}
