//! Threshold-flushed line buffer.
//!
//! Lines are accumulated in memory and written to the sink in one call once
//! more than `buffer_len` lines are held, or unconditionally on shutdown.
//! A failed write leaves the buffer intact and is reported as
//! [`LoggerError::FlushFailed`].

use super::FlushSink;
use crate::error::{LoggerError, LoggerResult};
use tracing::{debug, error};

/// Default flush threshold.
pub const DEFAULT_BUFFER_LEN: usize = 100;

/// Buffers formatted lines in front of a [`FlushSink`].
#[derive(Debug)]
pub struct BufferedWriter<K: FlushSink> {
    sink: K,
    buffer: String,
    count: usize,
    buffer_len: usize,
    flushes: usize,
    lines_flushed: usize,
}

impl<K: FlushSink> BufferedWriter<K> {
    /// Writer flushing once more than `buffer_len` lines are pending.
    /// A zero threshold is treated as 1.
    pub fn new(sink: K, buffer_len: usize) -> Self {
        Self {
            sink,
            buffer: String::new(),
            count: 0,
            buffer_len: buffer_len.max(1),
            flushes: 0,
            lines_flushed: 0,
        }
    }

    /// Write the header block straight to the sink, bypassing the buffer.
    pub fn write_header(&mut self, header: &str) -> LoggerResult<()> {
        self.sink.append(header)?;
        debug!(sink = %self.sink.describe(), "Header written");
        Ok(())
    }

    /// Buffer one line. A missing trailing newline is added.
    pub fn append(&mut self, line: &str) {
        self.buffer.push_str(line);
        if !line.ends_with('\n') {
            self.buffer.push('\n');
        }
        self.count += 1;
    }

    /// Flush if more than `buffer_len` lines are pending. Returns whether a
    /// write happened.
    pub fn flush_if_due(&mut self) -> LoggerResult<bool> {
        if self.count > self.buffer_len {
            self.flush_now()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Flush all pending lines. Returns the number of lines written; an
    /// empty buffer performs no write.
    pub fn flush_now(&mut self) -> LoggerResult<usize> {
        if self.count == 0 {
            return Ok(0);
        }

        if let Err(source) = self.sink.append(&self.buffer) {
            error!(
                sink = %self.sink.describe(),
                pending_lines = self.count,
                error = %source,
                "Flush failed"
            );
            return Err(LoggerError::FlushFailed {
                pending_lines: self.count,
                source,
            });
        }

        let written = self.count;
        self.buffer.clear();
        self.count = 0;
        self.flushes += 1;
        self.lines_flushed += written;
        debug!(lines = written, sink = %self.sink.describe(), "Buffer flushed");
        Ok(written)
    }

    /// Lines currently held in memory.
    pub fn pending(&self) -> usize {
        self.count
    }

    /// Flush threshold.
    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    /// Number of successful non-empty flushes.
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Total lines persisted through this writer.
    pub fn lines_flushed(&self) -> usize {
        self.lines_flushed
    }

    /// Borrow the sink.
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Consume the writer, returning the sink. Pending lines are dropped.
    pub fn into_sink(self) -> K {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemorySink;

    fn line(i: usize) -> String {
        format!("line {i}\n")
    }

    #[test]
    fn holds_lines_until_threshold_is_crossed() {
        let mut writer = BufferedWriter::new(MemorySink::new(), 3);
        for i in 0..3 {
            writer.append(&line(i));
            assert!(!writer.flush_if_due().unwrap());
        }
        assert_eq!(writer.pending(), 3);
        assert!(writer.sink().writes().is_empty());

        writer.append(&line(3));
        assert!(writer.flush_if_due().unwrap());
        assert_eq!(writer.pending(), 0);
        assert_eq!(writer.sink().writes().len(), 1);
        assert_eq!(writer.sink().lines().len(), 4);
    }

    #[test]
    fn flush_now_is_idempotent() {
        let mut writer = BufferedWriter::new(MemorySink::new(), 10);
        writer.append(&line(0));
        assert_eq!(writer.flush_now().unwrap(), 1);
        assert_eq!(writer.flush_now().unwrap(), 0);
        assert_eq!(writer.sink().writes().len(), 1);
        assert_eq!(writer.flushes(), 1);
    }

    #[test]
    fn empty_flush_performs_no_write() {
        let mut writer = BufferedWriter::new(MemorySink::new(), 10);
        assert_eq!(writer.flush_now().unwrap(), 0);
        assert!(writer.sink().writes().is_empty());
    }

    #[test]
    fn failed_flush_keeps_buffer() {
        let mut sink = MemorySink::new();
        sink.trigger_failure();
        let mut writer = BufferedWriter::new(sink, 10);
        writer.append(&line(0));
        writer.append(&line(1));

        let err = writer.flush_now().unwrap_err();
        assert_eq!(err.pending_lines(), 2);
        assert_eq!(writer.pending(), 2);
        assert_eq!(writer.flushes(), 0);

        // retry persists the same lines exactly once
        assert_eq!(writer.flush_now().unwrap(), 2);
        assert_eq!(writer.sink().lines(), vec!["line 0", "line 1"]);
    }

    #[test]
    fn header_bypasses_buffer() {
        let mut writer = BufferedWriter::new(MemorySink::new(), 10);
        writer.write_header("HEADER\n").unwrap();
        assert_eq!(writer.pending(), 0);
        assert_eq!(writer.sink().contents(), "HEADER\n");
    }

    #[test]
    fn missing_newline_is_added() {
        let mut writer = BufferedWriter::new(MemorySink::new(), 10);
        writer.append("no newline");
        writer.flush_now().unwrap();
        assert_eq!(writer.sink().contents(), "no newline\n");
    }

    #[test]
    fn zero_threshold_is_clamped() {
        let writer = BufferedWriter::new(MemorySink::new(), 0);
        assert_eq!(writer.buffer_len(), 1);
    }
}
