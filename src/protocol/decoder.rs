//! RAWMONITOR payload decoder.
//!
//! A valid payload carries the literal tag and two integer fields separated
//! by `_`. The frequency field is transformed according to the deployment's
//! [`ProtocolVariant`]; the temperature field is always in tenths of a
//! degree.

use super::frame::RawFrame;
use crate::reading::{DecodedReading, Temperature};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Literal marker identifying a payload frame.
pub const TAG: &str = "RAWMONITOR";

/// Twice the 8 MHz reference used by offset-reporting firmware.
pub const FREQUENCY_OFFSET_BASE: i64 = 2 * 8_000_000;

/// Numeric transform applied to the raw frequency field.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVariant {
    /// Firmware reports `16 MHz - f`; the frequency is recovered by
    /// subtracting the raw value from [`FREQUENCY_OFFSET_BASE`].
    #[default]
    #[serde(alias = "a")]
    #[value(alias = "a")]
    Offset,
    /// Firmware reports the frequency in Hz directly.
    #[serde(alias = "b")]
    #[value(alias = "b")]
    Direct,
}

impl ProtocolVariant {
    /// Convert a raw frequency field to Hz. `None` on arithmetic overflow.
    pub fn frequency(self, raw: i64) -> Option<i64> {
        match self {
            ProtocolVariant::Offset => FREQUENCY_OFFSET_BASE.checked_sub(raw),
            ProtocolVariant::Direct => Some(raw),
        }
    }
}

impl fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVariant::Offset => f.write_str("offset"),
            ProtocolVariant::Direct => f.write_str("direct"),
        }
    }
}

/// Why a frame candidate was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidFrame {
    #[error("empty frame")]
    Empty,

    #[error("frame cut short after {len} byte(s)")]
    Truncated { len: usize },

    #[error("missing RAWMONITOR tag")]
    MissingTag,

    #[error("expected 2 payload fields, found {found}")]
    FieldCount { found: usize },

    #[error("{field} field is not an integer: {value:?}")]
    BadNumber { field: &'static str, value: String },
}

/// Decode one frame candidate from the reader.
///
/// A candidate cut short by a timeout or the length cap is always rejected
/// as [`InvalidFrame::Truncated`], whatever its text looks like.
pub fn decode_frame(raw: &RawFrame, variant: ProtocolVariant) -> Result<DecodedReading, InvalidFrame> {
    if raw.truncated {
        return Err(InvalidFrame::Truncated {
            len: raw.text.len(),
        });
    }
    decode(&raw.text, variant)
}

/// Decode the text of a complete frame.
///
/// ```
/// use qcm_logger::protocol::{decode, ProtocolVariant};
///
/// let reading = decode("RAWMONITOR10000000_253", ProtocolVariant::Offset).unwrap();
/// assert_eq!(reading.frequency, 6_000_000);
/// assert_eq!(reading.temperature.to_string(), "25.3");
/// ```
pub fn decode(text: &str, variant: ProtocolVariant) -> Result<DecodedReading, InvalidFrame> {
    if text.is_empty() {
        return Err(InvalidFrame::Empty);
    }
    if !text.contains(TAG) {
        return Err(InvalidFrame::MissingTag);
    }

    let payload = text.replace(TAG, "");
    let fields: Vec<&str> = payload.split('_').collect();
    let [raw_freq, raw_temp] = fields.as_slice() else {
        return Err(InvalidFrame::FieldCount {
            found: fields.len(),
        });
    };

    let raw_freq = parse_field("frequency", raw_freq)?;
    let raw_temp = parse_field("temperature", raw_temp)?;
    let frequency = variant
        .frequency(raw_freq)
        .ok_or_else(|| InvalidFrame::BadNumber {
            field: "frequency",
            value: raw_freq.to_string(),
        })?;

    Ok(DecodedReading {
        frequency,
        temperature: Temperature::from_tenths(raw_temp),
    })
}

fn parse_field(field: &'static str, value: &str) -> Result<i64, InvalidFrame> {
    value.trim().parse().map_err(|_| InvalidFrame::BadNumber {
        field,
        value: value.to_string(),
    })
}
