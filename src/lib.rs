//! # QCM Logger Core Library
//!
//! Reads RAWMONITOR frames from an openQCM microbalance over a serial link,
//! decodes them into frequency/temperature readings, timestamps them and
//! appends them to a text log with buffered flushing.
//!
//! ## Crate Structure
//!
//! - **`source`**: The `ByteSource` trait, the serial port binding and a
//!   scripted mock source.
//! - **`protocol`**: Sentinel-delimited frame reader and the payload decoder,
//!   including the two frequency transform variants.
//! - **`reading`**: Decoded readings, timestamp rendering and the output line
//!   format.
//! - **`storage`**: The buffered writer and its sinks (append-mode file,
//!   in-memory).
//! - **`pipeline`**: The cooperative polling loop tying the above together,
//!   plus shutdown signalling.
//! - **`config`**: Layered configuration via `figment`.
//! - **`logging`**: `tracing-subscriber` initialisation.
//! - **`error`**: The `LoggerError` enum.

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod protocol;
pub mod reading;
pub mod source;
pub mod storage;

pub use error::{LoggerError, LoggerResult};
pub use pipeline::{Pipeline, PipelineStats, PollOutcome, ShutdownSignal};
