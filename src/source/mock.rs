//! Scripted byte source for testing
//!
//! `MockSource` replays a queue of bytes and timeout gaps so the frame reader
//! and pipeline can be exercised without a serial device. It provides:
//! - Byte-exact replay of captured device output
//! - Timeout injection (mid-frame or while idle)
//! - Failure injection for the next read
//! - Close tracking for shutdown verification

use super::{ByteSource, ReadByte};
use crate::error::{LoggerError, LoggerResult};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Byte(u8),
    Gap,
}

/// Scripted byte source for tests and hardware-free runs.
///
/// # Example
///
/// ```
/// use qcm_logger::source::{ByteSource, MockSource, ReadByte};
///
/// let mut source = MockSource::new().with_bytes(b"AB");
/// assert!(source.bytes_available().unwrap());
/// assert_eq!(source.read_byte().unwrap(), ReadByte::Byte(b'A'));
/// ```
#[derive(Debug, Default)]
pub struct MockSource {
    events: VecDeque<Event>,
    closed: bool,
    fail_next: bool,
    reads: usize,
}

impl MockSource {
    /// Create an empty source. Reads time out until bytes are queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue raw bytes (builder form).
    pub fn with_bytes(mut self, bytes: &[u8]) -> Self {
        self.push_bytes(bytes);
        self
    }

    /// Queue raw bytes.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.events.extend(bytes.iter().copied().map(Event::Byte));
    }

    /// Queue a timeout. Mid-frame it truncates the frame; while idle it
    /// reads as "no data".
    pub fn push_timeout(&mut self) {
        self.events.push_back(Event::Gap);
    }

    /// Make the next `read_byte` fail with an I/O error.
    pub fn trigger_failure(&mut self) {
        self.fail_next = true;
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Bytes still queued.
    pub fn remaining(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Byte(_)))
            .count()
    }

    /// Number of `read_byte` calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads
    }
}

impl ByteSource for MockSource {
    fn bytes_available(&mut self) -> LoggerResult<bool> {
        if self.closed {
            return Err(LoggerError::SerialPortNotConnected);
        }
        match self.events.front() {
            Some(Event::Byte(_)) => Ok(true),
            Some(Event::Gap) => {
                // An idle gap is consumed by one poll.
                self.events.pop_front();
                Ok(false)
            }
            None => Ok(false),
        }
    }

    fn read_byte(&mut self) -> LoggerResult<ReadByte> {
        if self.closed {
            return Err(LoggerError::SerialPortNotConnected);
        }
        self.reads += 1;
        if std::mem::take(&mut self.fail_next) {
            return Err(LoggerError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock read failure",
            )));
        }
        match self.events.pop_front() {
            Some(Event::Byte(b)) => Ok(ReadByte::Byte(b)),
            Some(Event::Gap) | None => Ok(ReadByte::TimedOut),
        }
    }

    fn close(&mut self) -> LoggerResult<()> {
        self.closed = true;
        tracing::debug!("MockSource closed");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("MockSource ({} bytes queued)", self.remaining())
    }
}
