//! Serial port source for RS-232/USB-serial devices
//!
//! Wraps the `serialport` crate. The port is opened with 8 data bits and the
//! configured parity and stop bits; its read timeout bounds every single-byte
//! read, which is the only blocking point of the logging loop.

use super::{ByteSource, ReadByte};
use crate::config::{DeviceConfig, ParitySetting, StopBitsSetting};
use crate::error::{LoggerError, LoggerResult};
use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
use std::io::Read;
use std::time::Duration;
use tracing::{debug, info};

impl From<ParitySetting> for Parity {
    fn from(value: ParitySetting) -> Self {
        match value {
            ParitySetting::None => Parity::None,
            ParitySetting::Odd => Parity::Odd,
            ParitySetting::Even => Parity::Even,
        }
    }
}

impl From<StopBitsSetting> for StopBits {
    fn from(value: StopBitsSetting) -> Self {
        match value {
            StopBitsSetting::One => StopBits::One,
            StopBitsSetting::Two => StopBits::Two,
        }
    }
}

/// Builder for [`SerialSource`]
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use qcm_logger::source::SerialSourceBuilder;
///
/// let source = SerialSourceBuilder::new("/dev/ttyUSB0".to_string(), 115200)
///     .with_timeout(Duration::from_secs(2))
///     .open()?;
/// # Ok::<(), qcm_logger::error::LoggerError>(())
/// ```
pub struct SerialSourceBuilder {
    port_name: String,
    baud_rate: u32,
    timeout: Duration,
    parity: Parity,
    stop_bits: StopBits,
}

impl SerialSourceBuilder {
    /// Create a builder with 8N1 framing and a 2 second read timeout.
    pub fn new(port_name: String, baud_rate: u32) -> Self {
        Self {
            port_name,
            baud_rate,
            timeout: Duration::from_secs(2),
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }

    /// Builder preloaded from the `[device]` configuration section.
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self::new(config.port.clone(), config.baud_rate)
            .with_timeout(Duration::from_millis(config.timeout_ms))
            .with_parity(config.parity.into())
            .with_stop_bits(config.stop_bits.into())
    }

    /// Per-byte read timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Parity bit mode.
    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Number of stop bits.
    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    /// Open the port and discard anything already sitting in the input buffer.
    pub fn open(self) -> LoggerResult<SerialSource> {
        let port = serialport::new(&self.port_name, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(self.parity)
            .stop_bits(self.stop_bits)
            .timeout(self.timeout)
            .open()?;

        port.clear(ClearBuffer::Input)?;

        info!(
            port = %self.port_name,
            baud_rate = self.baud_rate,
            timeout_ms = self.timeout.as_millis() as u64,
            "Serial port opened"
        );

        Ok(SerialSource {
            port_name: self.port_name,
            baud_rate: self.baud_rate,
            port: Some(port),
        })
    }
}

/// Byte source backed by an open serial port.
pub struct SerialSource {
    port_name: String,
    baud_rate: u32,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialSource {
    fn port_mut(&mut self) -> LoggerResult<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(LoggerError::SerialPortNotConnected)
    }
}

impl ByteSource for SerialSource {
    fn bytes_available(&mut self) -> LoggerResult<bool> {
        Ok(self.port_mut()?.bytes_to_read()? > 0)
    }

    fn read_byte(&mut self) -> LoggerResult<ReadByte> {
        let port = self.port_mut()?;
        let mut buffer = [0u8; 1];
        match port.read(&mut buffer) {
            Ok(1) => Ok(ReadByte::Byte(buffer[0])),
            // Zero-length reads are reported by some drivers instead of a timeout
            Ok(_) => Ok(ReadByte::TimedOut),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(ReadByte::TimedOut),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) -> LoggerResult<()> {
        if self.port.take().is_some() {
            debug!(port = %self.port_name, "Serial port closed");
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{} @ {} baud", self.port_name, self.baud_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_convert_to_serialport_types() {
        assert_eq!(Parity::from(ParitySetting::None), Parity::None);
        assert_eq!(Parity::from(ParitySetting::Even), Parity::Even);
        assert_eq!(StopBits::from(StopBitsSetting::Two), StopBits::Two);
    }

    #[test]
    fn opening_missing_port_fails() {
        let result = SerialSourceBuilder::new("/dev/qcm-logger-does-not-exist".into(), 115200)
            .with_timeout(Duration::from_millis(10))
            .open();
        assert!(matches!(result, Err(LoggerError::Serial(_))));
    }
}
