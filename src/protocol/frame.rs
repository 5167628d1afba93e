//! Sentinel-delimited frame reader.

use crate::error::LoggerResult;
use crate::source::{ByteSource, ReadByte};
use tracing::{trace, warn};

/// Frame terminator.
pub const SENTINEL: u8 = 0xFF;

/// Upper bound on accumulated bytes before the candidate is cut short.
pub const DEFAULT_MAX_FRAME_LEN: usize = 256;

/// A frame candidate with the sentinel removed and trailing whitespace stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Payload decoded as text (lossy for non UTF-8 bytes).
    pub text: String,
    /// `true` when the read ended on a timeout or the length cap rather than
    /// the sentinel.
    pub truncated: bool,
}

/// Result of one poll of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameRead {
    /// Nothing was waiting on the source.
    NoData,
    /// A candidate frame, complete or truncated.
    Frame(RawFrame),
}

/// Pulls bytes one at a time until the sentinel shows up.
#[derive(Debug, Clone)]
pub struct FrameReader {
    max_frame_len: usize,
    buffer: Vec<u8>,
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LEN)
    }
}

impl FrameReader {
    /// Create a reader that gives up on a frame after `max_frame_len` bytes.
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            max_frame_len: max_frame_len.max(1),
            buffer: Vec::with_capacity(64),
        }
    }

    /// Maximum frame length in bytes.
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    /// Poll `source` for one frame.
    ///
    /// Returns [`FrameRead::NoData`] immediately when the source reports no
    /// pending bytes. Otherwise reads until the sentinel, a timeout, or the
    /// length cap. Truncated candidates are still returned so the decoder can
    /// reject them.
    pub fn read_frame<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> LoggerResult<FrameRead> {
        if !source.bytes_available()? {
            return Ok(FrameRead::NoData);
        }

        self.buffer.clear();
        let mut truncated = false;
        loop {
            match source.read_byte()? {
                ReadByte::Byte(SENTINEL) => break,
                ReadByte::Byte(b) => {
                    self.buffer.push(b);
                    if self.buffer.len() >= self.max_frame_len {
                        warn!(
                            len = self.buffer.len(),
                            "Frame exceeded maximum length without sentinel"
                        );
                        truncated = true;
                        break;
                    }
                }
                ReadByte::TimedOut => {
                    warn!(len = self.buffer.len(), "Read timed out mid-frame");
                    truncated = true;
                    break;
                }
            }
        }

        let text = String::from_utf8_lossy(&self.buffer).trim_end().to_string();
        trace!(frame = %text.escape_default(), truncated, "Frame read");
        Ok(FrameRead::Frame(RawFrame { text, truncated }))
    }
}
