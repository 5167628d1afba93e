//! Acquisition pipeline.
//!
//! One [`Pipeline`] owns everything a logging session touches: the byte
//! source, the frame reader, the protocol variant, the clock and the
//! buffered writer. The loop is single-threaded and cooperative:
//!
//! ```text
//! poll source ──NoData──> idle wait ──┐
//!      │                              │
//!    Frame ─> decode ─> format ─> buffer ─> flush if due
//!      │
//!   Invalid ─> dropped
//! ```
//!
//! Cancellation is signalled through a [`ShutdownSignal`]. Once it fires the
//! loop stops, any frame that was being read is discarded, the source is
//! closed and the buffer is flushed unconditionally.

use crate::config::LoggerConfig;
use crate::error::{LoggerError, LoggerResult};
use crate::protocol::{decode_frame, FrameRead, FrameReader, InvalidFrame, ProtocolVariant};
use crate::reading::{format_line, Clock, SystemClock};
use crate::source::ByteSource;
use crate::storage::{BufferedWriter, FlushSink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Fire-once cancellation flag shared between the signal handler and the
/// loop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
}

impl ShutdownSignal {
    /// New, untriggered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Returns `true` only for the call that actually
    /// triggered it.
    pub fn trigger(&self) -> bool {
        !self.triggered.swap(true, Ordering::SeqCst)
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

/// What one loop iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// No bytes were waiting.
    NoData,
    /// A reading was decoded and buffered; carries the formatted line.
    Recorded(String),
    /// A frame was rejected by the decoder.
    Dropped(InvalidFrame),
    /// Shutdown fired while the frame was in flight; it was thrown away.
    Discarded,
}

/// Session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frame candidates read from the source
    pub frames: usize,
    /// Readings buffered
    pub recorded: usize,
    /// Frames rejected by the decoder
    pub dropped: usize,
    /// Frames thrown away because shutdown was requested mid-read
    pub discarded: usize,
    /// Successful non-empty flushes
    pub flushes: usize,
    /// Lines persisted
    pub lines_flushed: usize,
}

/// Reader → decoder → formatter → writer.
pub struct Pipeline<S: ByteSource, K: FlushSink, C: Clock = SystemClock> {
    source: S,
    reader: FrameReader,
    variant: ProtocolVariant,
    clock: C,
    writer: BufferedWriter<K>,
    idle_delay: Duration,
    stats: PipelineStats,
    closed: bool,
}

impl<S: ByteSource, K: FlushSink> Pipeline<S, K, SystemClock> {
    /// Pipeline stamping readings with the system clock.
    pub fn new(source: S, writer: BufferedWriter<K>, variant: ProtocolVariant) -> Self {
        Self {
            source,
            reader: FrameReader::default(),
            variant,
            clock: SystemClock,
            writer,
            idle_delay: Duration::from_millis(1),
            stats: PipelineStats::default(),
            closed: false,
        }
    }

    /// Pipeline wired from the loaded configuration.
    pub fn from_config(source: S, sink: K, config: &LoggerConfig) -> Self {
        Self::new(
            source,
            BufferedWriter::new(sink, config.output.buffer_len),
            config.protocol.variant,
        )
        .with_max_frame_len(config.protocol.max_frame_len)
        .with_idle_delay(Duration::from_millis(config.protocol.idle_delay_ms))
    }
}

impl<S: ByteSource, K: FlushSink, C: Clock> Pipeline<S, K, C> {
    /// Replace the clock.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Pipeline<S, K, C2> {
        Pipeline {
            source: self.source,
            reader: self.reader,
            variant: self.variant,
            clock,
            writer: self.writer,
            idle_delay: self.idle_delay,
            stats: self.stats,
            closed: self.closed,
        }
    }

    /// Cap on frame length before a candidate is cut short.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.reader = FrameReader::new(max_frame_len);
        self
    }

    /// Sleep between empty polls. Zero disables the wait.
    pub fn with_idle_delay(mut self, idle_delay: Duration) -> Self {
        self.idle_delay = idle_delay;
        self
    }

    /// Write the header block to the sink, bypassing the buffer.
    pub fn write_header(&mut self, header: &str) -> LoggerResult<()> {
        self.writer.write_header(header)
    }

    /// Run one iteration of the loop.
    pub fn poll_once(&mut self) -> LoggerResult<PollOutcome> {
        self.poll(None, &mut |_| {})
    }

    /// `on_line` sees a recorded line before the threshold flush, so a line
    /// is echoed even when that flush fails.
    fn poll(
        &mut self,
        signal: Option<&ShutdownSignal>,
        on_line: &mut dyn FnMut(&str),
    ) -> LoggerResult<PollOutcome> {
        if self.closed {
            return Err(LoggerError::SerialPortNotConnected);
        }

        let raw = match self.reader.read_frame(&mut self.source)? {
            FrameRead::NoData => return Ok(PollOutcome::NoData),
            FrameRead::Frame(raw) => raw,
        };
        self.stats.frames += 1;

        if signal.is_some_and(ShutdownSignal::is_triggered) {
            self.stats.discarded += 1;
            debug!(frame = %raw.text.escape_default(), "Frame discarded on shutdown");
            return Ok(PollOutcome::Discarded);
        }

        let reading = match decode_frame(&raw, self.variant) {
            Ok(reading) => reading,
            Err(reason) => {
                self.stats.dropped += 1;
                debug!(
                    frame = %raw.text.escape_default(),
                    truncated = raw.truncated,
                    %reason,
                    "Frame dropped"
                );
                return Ok(PollOutcome::Dropped(reason));
            }
        };

        let line = format_line(&reading, &self.clock.now());
        self.writer.append(&line);
        self.stats.recorded += 1;
        on_line(line.trim_end());
        self.writer.flush_if_due()?;
        Ok(PollOutcome::Recorded(line))
    }

    /// Loop until `signal` fires or an error occurs, then shut down.
    ///
    /// `on_line` sees every recorded line as it is buffered. The shutdown
    /// flush runs on every exit path; if the loop failed, its error is
    /// returned after the flush attempt.
    pub fn run<F: FnMut(&str)>(
        &mut self,
        signal: &ShutdownSignal,
        mut on_line: F,
    ) -> LoggerResult<PipelineStats> {
        info!(
            source = %self.source.describe(),
            sink = %self.writer.sink().describe(),
            variant = %self.variant,
            buffer_len = self.writer.buffer_len(),
            "Logging started"
        );

        let outcome = self.run_loop(signal, &mut on_line);
        let shutdown = self.shutdown();

        match (outcome, shutdown) {
            (Ok(()), result) => result,
            (Err(e), Ok(_)) => Err(e),
            (Err(e), Err(flush_err)) => {
                error!(error = %flush_err, "Final flush after failure also failed");
                Err(e)
            }
        }
    }

    fn run_loop<F: FnMut(&str)>(&mut self, signal: &ShutdownSignal, on_line: &mut F) -> LoggerResult<()> {
        while !signal.is_triggered() {
            if self.poll(Some(signal), on_line)? == PollOutcome::NoData
                && !self.idle_delay.is_zero()
            {
                std::thread::sleep(self.idle_delay);
            }
        }
        Ok(())
    }

    /// Close the source and flush every pending line. Safe to call twice.
    pub fn shutdown(&mut self) -> LoggerResult<PipelineStats> {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.source.close() {
                warn!(error = %e, "Failed to close source cleanly");
            }
        }

        let flushed = self.writer.flush_now()?;
        let stats = self.stats();
        info!(
            final_flush = flushed,
            frames = stats.frames,
            recorded = stats.recorded,
            dropped = stats.dropped,
            lines_flushed = stats.lines_flushed,
            "Logging stopped"
        );
        Ok(stats)
    }

    /// Current counters.
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            flushes: self.writer.flushes(),
            lines_flushed: self.writer.lines_flushed(),
            ..self.stats
        }
    }

    /// Lines buffered but not yet persisted.
    pub fn pending(&self) -> usize {
        self.writer.pending()
    }

    /// Borrow the source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Borrow the sink.
    pub fn sink(&self) -> &K {
        self.writer.sink()
    }
}
