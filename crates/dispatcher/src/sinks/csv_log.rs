//! CsvLogSink - durable append-only sample log

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use contracts::{ContractError, Sample, SampleSink, LOG_HEADER};
use tracing::{debug, info, instrument};

use crate::error::DispatcherError;

/// Writes one row per sample under the `t_s,seq,ax,ay,az,gx,gy,gz` header
///
/// Every row is flushed as soon as it is written so a crash loses at most
/// the sample in flight.
pub struct CsvLogSink {
    name: String,
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    rows: u64,
}

impl CsvLogSink {
    /// Create (truncate) the log at `path` and write the header row
    pub fn new(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, DispatcherError> {
        let name = name.into();
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(&path)
            .map_err(|e| DispatcherError::sink_creation(&name, e.to_string()))?;
        writer
            .write_record(LOG_HEADER)
            .map_err(|e| DispatcherError::sink_creation(&name, e.to_string()))?;
        writer.flush()?;

        debug!(sink = %name, path = %path.display(), "CSV log opened");

        Ok(Self {
            name,
            path,
            writer: Some(writer),
            rows: 0,
        })
    }

    /// Create from the `path` sink parameter
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, DispatcherError> {
        let name = name.into();
        let path = params
            .get("path")
            .ok_or_else(|| DispatcherError::MissingParam {
                name: name.clone(),
                param: "path".to_string(),
            })?
            .clone();
        Self::new(name, path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows written, excluding the header
    pub fn rows(&self) -> u64 {
        self.rows
    }

    fn record(sample: &Sample) -> [String; 8] {
        [
            format!("{:.6}", sample.timestamp),
            sample.seq.to_string(),
            sample.ax.to_string(),
            sample.ay.to_string(),
            sample.az.to_string(),
            sample.gx.to_string(),
            sample.gy.to_string(),
            sample.gz.to_string(),
        ]
    }

    fn sink_error(&self, e: impl std::fmt::Display) -> ContractError {
        ContractError::sink_write(&self.name, e.to_string())
    }
}

impl SampleSink for CsvLogSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, sample: &Sample) -> Result<(), ContractError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(ContractError::sink_write(&self.name, "log already closed"));
        };

        let outcome = writer
            .write_record(Self::record(sample))
            .map_err(|e| e.to_string())
            .and_then(|()| writer.flush().map_err(|e| e.to_string()));

        match outcome {
            Ok(()) => {
                self.rows += 1;
                Ok(())
            }
            Err(e) => Err(self.sink_error(e)),
        }
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(name = "csv_sink_close", skip(self), fields(sink = %self.name))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| self.sink_error(e))?;
            info!(rows = self.rows, path = %self.path.display(), "CSV log closed");
        }
        Ok(())
    }
}
