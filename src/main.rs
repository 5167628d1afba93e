//! CLI Entry Point for qcm_logger
//!
//! Opens the serial device, writes the header block to the output file and
//! logs readings until interrupted. Ctrl+C (or SIGTERM on Unix) stops the
//! loop, flushes buffered readings and exits cleanly.
//!
//! # Usage
//!
//! ```bash
//! qcm_logger --port /dev/ttyUSB0 --output run1.txt
//! qcm_logger --config config/qcm_logger.toml --variant direct
//! qcm_logger --print-config
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use qcm_logger::config::LoggerConfig;
use qcm_logger::protocol::ProtocolVariant;
use qcm_logger::logging;
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser)]
#[command(name = "qcm_logger")]
#[command(about = "Serial data logger for openQCM microbalance", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial port (e.g. /dev/ttyUSB0, COM46)
    #[arg(long)]
    port: Option<String>,

    /// Baud rate
    #[arg(long)]
    baud_rate: Option<u32>,

    /// Per-byte read timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Output file (appended to)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Comment written into the header block
    #[arg(long)]
    comment: Option<String>,

    /// Lines to buffer before writing to the file
    #[arg(long)]
    buffer_len: Option<usize>,

    /// Frequency transform of the connected firmware
    #[arg(long, value_enum)]
    variant: Option<ProtocolVariant>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Do not echo readings to stdout
    #[arg(long)]
    quiet: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn apply(self, config: &mut LoggerConfig) {
        if let Some(port) = self.port {
            config.device.port = port;
        }
        if let Some(baud_rate) = self.baud_rate {
            config.device.baud_rate = baud_rate;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.device.timeout_ms = timeout_ms;
        }
        if let Some(output) = self.output {
            config.output.file = output;
        }
        if let Some(comment) = self.comment {
            config.output.comment = comment;
        }
        if let Some(buffer_len) = self.buffer_len {
            config.output.buffer_len = buffer_len;
        }
        if let Some(variant) = self.variant {
            config.protocol.variant = variant;
        }
        if let Some(log_level) = self.log_level {
            config.application.log_level = log_level;
        }
        if self.quiet {
            config.output.echo = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let print_config = cli.print_config;

    let mut config =
        LoggerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    if print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    logging::init_from_config(&config).map_err(anyhow::Error::msg)?;

    run(config).await
}

#[cfg(feature = "instrument_serial")]
async fn run(config: LoggerConfig) -> Result<()> {
    use qcm_logger::source::SerialSourceBuilder;
    use qcm_logger::storage::{header_block, AppendFileSink};
    use qcm_logger::{Pipeline, ShutdownSignal};
    use tracing::{error, info};

    let source = SerialSourceBuilder::from_config(&config.device)
        .open()
        .with_context(|| format!("Failed to open serial port '{}'", config.device.port))?;

    let header = header_block(
        &config.output.comment,
        &config.output.data_header,
        &config.output.data_units,
    );
    let sink = AppendFileSink::new(&config.output.file);
    let mut pipeline = Pipeline::from_config(source, sink, &config);
    pipeline.write_header(&header).with_context(|| {
        format!(
            "Failed to write header to '{}'",
            config.output.file.display()
        )
    })?;
    print!("{header}");

    let signal = ShutdownSignal::new();
    let echo = config.output.echo;
    let worker_signal = signal.clone();
    let mut worker = tokio::task::spawn_blocking(move || {
        pipeline.run(&worker_signal, |line| {
            if echo {
                println!("{line}");
            }
        })
    });

    // The worker only finishes on its own when the loop fails
    let joined = tokio::select! {
        joined = &mut worker => joined,
        _ = wait_for_shutdown() => {
            if signal.trigger() {
                info!("Shutdown requested, flushing buffered readings");
            }
            worker.await
        }
    };

    match joined.context("Logging task panicked")? {
        Ok(stats) => {
            info!(
                recorded = stats.recorded,
                dropped = stats.dropped,
                "Session complete"
            );
            println!("Data logging stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, pending_lines = e.pending_lines(), "Logging aborted");
            Err(e.into())
        }
    }
}

#[cfg(not(feature = "instrument_serial"))]
async fn run(_config: LoggerConfig) -> Result<()> {
    Err(qcm_logger::LoggerError::SerialFeatureDisabled.into())
}

/// Wait for Ctrl+C, or SIGTERM on Unix.
#[cfg_attr(not(feature = "instrument_serial"), allow(dead_code))]
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let term_signal = match signal(SignalKind::terminate()) {
            Ok(sig) => Some(sig),
            Err(e) => {
                warn!(
                    "Failed to install SIGTERM handler: {}. Only Ctrl+C will stop logging",
                    e
                );
                None
            }
        };

        tokio::select! {
            _ = wait_for_ctrl_c() => {},
            _ = async {
                if let Some(mut sig) = term_signal {
                    sig.recv().await;
                } else {
                    std::future::pending::<()>().await
                }
            } => {},
        }
    }
    #[cfg(not(unix))]
    {
        wait_for_ctrl_c().await;
    }
}

/// Resolves on Ctrl+C. If the handler cannot be installed this never
/// resolves, so a handler failure is not mistaken for a shutdown request.
#[cfg_attr(not(feature = "instrument_serial"), allow(dead_code))]
async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(
            "Failed to install Ctrl+C handler: {}. Logging until the process is killed",
            e
        );
        std::future::pending::<()>().await
    }
}
