//! Custom error types for the logger.
//!
//! `LoggerError` is the single error type returned by the library. It covers
//! configuration loading, the serial link and the output file. Frame decode
//! failures are deliberately *not* part of it: a malformed frame is an
//! expected event on a noisy serial line and is modelled by
//! [`InvalidFrame`](crate::protocol::InvalidFrame) instead.
//!
//! ## Error Hierarchy
//!
//! - **`Config`**: Wraps errors from `figment` (file parsing, type mismatches).
//! - **`Configuration`**: Semantic errors caught by `LoggerConfig::validate`.
//! - **`Io`**: Any `std::io::Error` outside the flush path.
//! - **`Serial`**: Failures opening or configuring the serial port.
//! - **`FlushFailed`**: A buffered write to the output file failed. This is
//!   fatal; the lines that were not persisted stay in the buffer and their
//!   count is reported to the operator.

use thiserror::Error;

/// Convenience alias for results using the logger error type.
pub type LoggerResult<T> = std::result::Result<T, LoggerError>;

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "instrument_serial")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Serial port not connected")]
    SerialPortNotConnected,

    #[error("Serial support not enabled. Rebuild with --features instrument_serial")]
    SerialFeatureDisabled,

    #[error("Failed to flush {pending_lines} buffered line(s) to output file: {source}")]
    FlushFailed {
        pending_lines: usize,
        #[source]
        source: std::io::Error,
    },
}

impl From<figment::Error> for LoggerError {
    fn from(value: figment::Error) -> Self {
        LoggerError::Config(Box::new(value))
    }
}

impl LoggerError {
    /// Number of readings that were acknowledged by the pipeline but never
    /// reached the output file.
    pub fn pending_lines(&self) -> usize {
        match self {
            LoggerError::FlushFailed { pending_lines, .. } => *pending_lines,
            _ => 0,
        }
    }
}
