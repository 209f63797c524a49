//! Durable log reader
//!
//! Columns are located by header name, so extra or reordered columns are
//! accepted. A missing required column or a non-numeric cell fails the whole
//! read.

use std::fs::File;
use std::io;
use std::path::Path;

use contracts::{SampleField, LOG_HEADER};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::error::{AnalysisError, Result};

/// Rows that carry a log timestamp
pub trait TimedRow {
    fn time(&self) -> f64;
}

/// Angular-rate row consumed by rep segmentation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GyroRow {
    pub time: f64,
    pub gx: f64,
    pub gy: f64,
    pub gz: f64,
}

impl GyroRow {
    /// Angular-rate magnitude (deg/s)
    pub fn magnitude(&self) -> f64 {
        (self.gx * self.gx + self.gy * self.gy + self.gz * self.gz).sqrt()
    }
}

impl TimedRow for GyroRow {
    fn time(&self) -> f64 {
        self.time
    }
}

/// Acceleration row consumed by trajectory estimation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelRow {
    pub time: f64,
    pub ax: f64,
    pub ay: f64,
    pub az: f64,
}

impl TimedRow for AccelRow {
    fn time(&self) -> f64 {
        self.time
    }
}

/// Header-indexed reader over a durable sample log
pub struct LogReader<R> {
    reader: csv::Reader<R>,
}

impl LogReader<File> {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = builder().from_path(path)?;
        debug!(path = %path.display(), "Opened sample log");
        Ok(Self { reader })
    }
}

impl<R: io::Read> LogReader<R> {
    pub fn from_reader(rdr: R) -> Self {
        Self {
            reader: builder().from_reader(rdr),
        }
    }

    /// Read `t_s`, `gx`, `gy`, `gz`
    pub fn gyro_rows(mut self) -> Result<Vec<GyroRow>> {
        let rows = self.read_columns([SampleField::Gx, SampleField::Gy, SampleField::Gz])?;
        Ok(rows
            .into_iter()
            .map(|(time, [gx, gy, gz])| GyroRow { time, gx, gy, gz })
            .collect())
    }

    /// Read `t_s`, `ax`, `ay`, `az`
    pub fn accel_rows(mut self) -> Result<Vec<AccelRow>> {
        let rows = self.read_columns([SampleField::Ax, SampleField::Ay, SampleField::Az])?;
        Ok(rows
            .into_iter()
            .map(|(time, [ax, ay, az])| AccelRow { time, ax, ay, az })
            .collect())
    }

    fn read_columns<const N: usize>(
        &mut self,
        fields: [SampleField; N],
    ) -> Result<Vec<(f64, [f64; N])>> {
        let headers = self.reader.headers()?.clone();
        let time_col = column_index(&headers, LOG_HEADER[0])?;
        let mut value_cols = [0usize; N];
        for (slot, field) in value_cols.iter_mut().zip(fields) {
            *slot = column_index(&headers, field.column())?;
        }

        let mut rows = Vec::new();
        for (idx, record) in self.reader.records().enumerate() {
            let record = record?;
            let row = idx + 1;

            let time = parse_cell(&record, row, time_col, LOG_HEADER[0])?;
            let mut values = [0.0; N];
            for ((value, col), field) in values.iter_mut().zip(value_cols).zip(fields) {
                *value = parse_cell(&record, row, col, field.column())?;
            }
            rows.push((time, values));
        }

        debug!(rows = rows.len(), "Read sample log");
        Ok(rows)
    }
}

fn builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder.has_headers(true).trim(Trim::All);
    builder
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| AnalysisError::MissingColumn {
            column: name.to_string(),
        })
}

fn parse_cell(record: &StringRecord, row: usize, col: usize, column: &str) -> Result<f64> {
    let cell = record.get(col).unwrap_or_default();
    match cell.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(AnalysisError::invalid_value(row, column, cell)),
    }
}

/// Stable sort by time; equal timestamps keep log order
pub fn sort_by_time<T: TimedRow>(rows: &mut [T]) {
    rows.sort_by(|a, b| a.time().total_cmp(&b.time()));
}

/// Fail on the first row whose time is earlier than its predecessor
pub fn ensure_sorted<T: TimedRow>(rows: &[T]) -> Result<()> {
    for (idx, pair) in rows.windows(2).enumerate() {
        let (previous, current) = (pair[0].time(), pair[1].time());
        if current < previous {
            return Err(AnalysisError::UnsortedInput {
                row: idx + 2,
                previous,
                current,
            });
        }
    }
    Ok(())
}
