//! Sink implementations

mod csv_log;
mod log;

pub use self::csv_log::CsvLogSink;
pub use self::log::LogSink;
