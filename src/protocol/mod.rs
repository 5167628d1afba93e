//! RAWMONITOR serial protocol.
//!
//! Frames are ASCII payloads terminated by a single `0xFF` sentinel:
//!
//! ```text
//! RAWMONITOR<raw_frequency>_<raw_temperature>\xFF
//! ```
//!
//! [`FrameReader`] cuts the byte stream into candidate frames and
//! [`decode_frame`] validates and converts a candidate into a
//! [`DecodedReading`](crate::reading::DecodedReading).

pub mod decoder;
pub mod frame;

pub use decoder::{decode, decode_frame, InvalidFrame, ProtocolVariant, FREQUENCY_OFFSET_BASE, TAG};
pub use frame::{FrameRead, FrameReader, RawFrame, DEFAULT_MAX_FRAME_LEN, SENTINEL};
