//! Decoded readings, timestamps and the persisted line format.
//!
//! Every reading is written as one line:
//!
//! ```text
//! YYYY.MM.DD,HH:MM:SS:mmm,<frequency>,<temperature>
//! ```
//!
//! Temperature is kept as fixed-point tenths of a degree so the rendered
//! value never depends on float rounding.

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use std::fmt;

/// Temperature in tenths of a degree Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Temperature {
    tenths: i64,
}

impl Temperature {
    /// Build from a raw protocol value, which is already in tenths.
    pub const fn from_tenths(tenths: i64) -> Self {
        Self { tenths }
    }

    /// Raw tenths value.
    pub const fn tenths(self) -> i64 {
        self.tenths
    }

    /// Value in degrees Celsius.
    pub fn as_celsius(self) -> f64 {
        self.tenths as f64 / 10.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.tenths < 0 { "-" } else { "" };
        let abs = self.tenths.unsigned_abs();
        write!(f, "{}{}.{}", sign, abs / 10, abs % 10)
    }
}

/// A validated frequency/temperature pair. Both fields always exist together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedReading {
    /// Resonator frequency in Hz.
    pub frequency: i64,
    /// Sensor temperature.
    pub temperature: Temperature,
}

/// Source of wall-clock time for stamping readings.
pub trait Clock {
    /// Current local time.
    fn now(&self) -> NaiveDateTime;
}

/// Local system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock frozen at a fixed instant. Used by tests and benchmarks.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

/// Millisecond field for a timestamp, rounded from microseconds and kept
/// within 0..=999.
pub fn millis_field(time: &NaiveDateTime) -> u32 {
    // Leap seconds are reported as nanos >= 1e9
    let micros = (time.nanosecond() / 1_000).min(999_999);
    ((micros + 500) / 1_000).min(999)
}

/// Render `time` as `YYYY.MM.DD,HH:MM:SS:mmm`.
pub fn format_timestamp(time: &NaiveDateTime) -> String {
    format!(
        "{:04}.{:02}.{:02},{:02}:{:02}:{:02}:{:03}",
        time.year(),
        time.month(),
        time.day(),
        time.hour(),
        time.minute(),
        time.second(),
        millis_field(time)
    )
}

/// Render a reading as a newline-terminated output line.
pub fn format_line(reading: &DecodedReading, now: &NaiveDateTime) -> String {
    format!(
        "{},{},{}\n",
        format_timestamp(now),
        reading.frequency,
        reading.temperature
    )
}
