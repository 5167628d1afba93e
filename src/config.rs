//! Configuration System using Figment
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. Built-in defaults (match the openQCM reference deployment)
//! 2. A TOML file (`config/qcm_logger.toml` unless `--config` is given)
//! 3. Environment variables prefixed with `QCM_LOGGER_`, using `__` between
//!    section and key, e.g. `QCM_LOGGER_OUTPUT__BUFFER_LEN=50`
//! 4. Command line flags (applied by the binary)
//!
//! # Example
//! ```no_run
//! use qcm_logger::config::LoggerConfig;
//!
//! let config = LoggerConfig::load(None)?;
//! config.validate()?;
//! println!("Logging {} to {}", config.device.port, config.output.file.display());
//! # Ok::<(), qcm_logger::error::LoggerError>(())
//! ```

use crate::error::{LoggerError, LoggerResult};
use crate::logging::OutputFormat;
use crate::protocol::{ProtocolVariant, DEFAULT_MAX_FRAME_LEN};
use crate::storage::DEFAULT_BUFFER_LEN;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/qcm_logger.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "QCM_LOGGER_";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Logging settings
    pub application: ApplicationConfig,
    /// Serial device settings
    pub device: DeviceConfig,
    /// Output file settings
    pub output: OutputConfig,
    /// Frame protocol settings
    pub protocol: ProtocolConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format
    pub log_format: OutputFormat,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: OutputFormat::Compact,
        }
    }
}

/// Serial device configuration. Passed through to the byte source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Port identifier (e.g. "/dev/ttyUSB0", "COM46")
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Per-byte read timeout in milliseconds
    pub timeout_ms: u64,
    /// Parity bit mode
    pub parity: ParitySetting,
    /// Stop bits (1 or 2)
    pub stop_bits: StopBitsSetting,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            timeout_ms: 2_000,
            parity: ParitySetting::None,
            stop_bits: StopBitsSetting::One,
        }
    }
}

/// Serial parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParitySetting {
    /// No parity bit
    None,
    /// Odd parity
    Odd,
    /// Even parity
    Even,
}

/// Serial stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StopBitsSetting {
    /// One stop bit
    One,
    /// Two stop bits
    Two,
}

impl TryFrom<u8> for StopBitsSetting {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(StopBitsSetting::One),
            2 => Ok(StopBitsSetting::Two),
            other => Err(format!("stop_bits must be 1 or 2, got {other}")),
        }
    }
}

impl From<StopBitsSetting> for u8 {
    fn from(value: StopBitsSetting) -> Self {
        match value {
            StopBitsSetting::One => 1,
            StopBitsSetting::Two => 2,
        }
    }
}

/// Output file configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output file path (opened in append mode)
    pub file: PathBuf,
    /// Free-text comment written into the header block
    pub comment: String,
    /// Column names, comma separated
    pub data_header: String,
    /// Column units, comma separated
    pub data_units: String,
    /// Flush once more than this many lines are buffered
    pub buffer_len: usize,
    /// Echo each reading line to stdout
    pub echo: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("SL_output.txt"),
            comment: "Output data from openQCM microbalance".to_string(),
            data_header: "date,time,frequency,temperature".to_string(),
            data_units: "yyyy.mm.dd,hh:mm:ss,Hz,deg.C".to_string(),
            buffer_len: DEFAULT_BUFFER_LEN,
            echo: true,
        }
    }
}

/// Frame protocol configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Frequency transform
    pub variant: ProtocolVariant,
    /// Sleep between empty polls, in milliseconds (0 = spin)
    pub idle_delay_ms: u64,
    /// Give up on a frame after this many bytes without a sentinel
    pub max_frame_len: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            variant: ProtocolVariant::Offset,
            idle_delay_ms: 1,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl LoggerConfig {
    /// Load configuration from defaults, a TOML file and the environment.
    ///
    /// With `path = None` the default file is used if present. An explicit
    /// path must exist.
    pub fn load(path: Option<&Path>) -> LoggerResult<Self> {
        let file = match path {
            Some(p) if !p.exists() => {
                return Err(LoggerError::Configuration(format!(
                    "Configuration file not found: {}",
                    p.display()
                )))
            }
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(DEFAULT_CONFIG_PATH),
        };

        Self::from_figment(
            Self::figment()
                .merge(Toml::file(file))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    /// Base figment holding the built-in defaults.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(LoggerConfig::default()))
    }

    /// Extract from an arbitrary figment.
    pub fn from_figment(figment: Figment) -> LoggerResult<Self> {
        Ok(figment.extract()?)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> LoggerResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(invalid(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.device.port.trim().is_empty() {
            return Err(invalid("device.port must not be empty".to_string()));
        }
        if self.device.baud_rate == 0 {
            return Err(invalid("device.baud_rate must be > 0".to_string()));
        }
        if self.device.timeout_ms == 0 {
            return Err(invalid("device.timeout_ms must be > 0".to_string()));
        }

        if self.output.file.as_os_str().is_empty() {
            return Err(invalid("output.file must not be empty".to_string()));
        }
        if self.output.buffer_len == 0 {
            return Err(invalid("output.buffer_len must be > 0".to_string()));
        }
        let columns = self.output.data_header.split(',').count();
        let units = self.output.data_units.split(',').count();
        if columns != units {
            return Err(invalid(format!(
                "output.data_header has {columns} column(s) but output.data_units has {units}"
            )));
        }

        if self.protocol.max_frame_len == 0 {
            return Err(invalid("protocol.max_frame_len must be > 0".to_string()));
        }

        Ok(())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> LoggerResult<String> {
        toml::to_string_pretty(self).map_err(|e| invalid(e.to_string()))
    }
}

fn invalid(msg: String) -> LoggerError {
    LoggerError::Configuration(msg)
}
