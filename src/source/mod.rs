//! Byte-stream sources feeding the frame reader.
//!
//! The pipeline never talks to hardware directly. It polls a [`ByteSource`]
//! for availability and then pulls single bytes, each bounded by the source's
//! own read timeout. Port selection, baud rate and framing settings belong to
//! the concrete source.

pub mod mock;
#[cfg(feature = "instrument_serial")]
pub mod serial;

pub use mock::MockSource;
#[cfg(feature = "instrument_serial")]
pub use serial::{SerialSource, SerialSourceBuilder};

use crate::error::LoggerResult;

/// Outcome of a single-byte read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadByte {
    /// A byte arrived within the timeout.
    Byte(u8),
    /// The per-byte timeout elapsed without data.
    TimedOut,
}

/// A readable stream of bytes with a non-blocking availability check.
pub trait ByteSource {
    /// Returns `true` if at least one byte can be read without waiting.
    fn bytes_available(&mut self) -> LoggerResult<bool>;

    /// Reads one byte, blocking at most for the source's configured timeout.
    fn read_byte(&mut self) -> LoggerResult<ReadByte>;

    /// Releases the underlying device. Further reads are an error.
    fn close(&mut self) -> LoggerResult<()>;

    /// Human readable description used in log output.
    fn describe(&self) -> String;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn bytes_available(&mut self) -> LoggerResult<bool> {
        (**self).bytes_available()
    }

    fn read_byte(&mut self) -> LoggerResult<ReadByte> {
        (**self).read_byte()
    }

    fn close(&mut self) -> LoggerResult<()> {
        (**self).close()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
