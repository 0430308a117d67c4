//! # Generator Monitor
//!
//! Standby generator telemetry daemon.
//!
//! Reads telemetry from the generator controller over serial, samples the
//! enclosure temperature/humidity sensor, and publishes status pages and an
//! audit log.

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use generator_monitor::acquisition::Acquisition;
use generator_monitor::config::Config;
use generator_monitor::error::MonitorError;
use generator_monitor::frame::decoder::FrameDecoder;
use generator_monitor::sensor::bus::LinuxSensorBus;
use generator_monitor::sensor::SensorReader;
use generator_monitor::serial::{run_intake, TelemetrySerial};

/// File name prefix for the rolling diagnostics log
const DIAGNOSTICS_FILE_PREFIX: &str = "generator-monitor.log";

/// Build the diagnostics filter from `RUST_LOG`-style directives
///
/// Falls back to INFO when `directives` is empty or none of it parses.
fn build_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives)
}

/// Install the tracing subscriber
///
/// Logs go to stdout, and additionally to a daily rolling file when a
/// diagnostics directory is configured. The returned guard must stay alive
/// for the file writer to flush.
fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let filter = build_filter(&std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default());

    match &config.log.diagnostics_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, DIAGNOSTICS_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
            None
        }
    }
}

/// Main entry point for the generator monitor
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, or built-in defaults)
///    - Set up logging
///    - Open the telemetry serial port (retried, fatal if it never opens)
///    - Open the I2C sensor bus
///
/// 2. **Main Loop**
///    - Intake task drains the serial port and queues complete lines
///    - Acquisition loop runs one cycle per line
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if:
/// - The configuration cannot be loaded
/// - The serial port or sensor bus cannot be opened
/// - A sensor transaction fails
/// - The serial stream ends
#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("loading {}", path))?,
        None => Config::default(),
    };

    let _log_guard = init_logging(&config);

    info!("Generator Monitor v{} starting...", env!("CARGO_PKG_VERSION"));

    let serial = TelemetrySerial::open(&config.serial).await?;
    info!("Telemetry port opened at: {}", serial.device_path());

    let bus = LinuxSensorBus::open(&config.sensor.bus, config.sensor.address)?;
    let sensor = SensorReader::new(bus, &config.sensor);

    let (line_tx, mut line_rx) = mpsc::channel(config.serial.line_queue_capacity);
    let decoder = FrameDecoder::new(config.serial.max_line_length);
    let intake = tokio::spawn(run_intake(serial.into_stream(), decoder, line_tx));

    let mut acquisition = Acquisition::new(sensor, &config, Utc::now());

    info!("Writing audit log to {}", config.log.path);
    info!("Press Ctrl+C to exit");

    let result = tokio::select! {
        result = acquisition.run(&mut line_rx) => result,

        // Handle Ctrl+C for graceful shutdown
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            Ok(())
        }
    };

    let stats = acquisition.stats();
    info!(
        "Total samples: {} published, {} discarded, {} logged",
        stats.published, stats.discarded, stats.logged
    );

    if let Err(e) = result {
        if matches!(e, MonitorError::IntakeClosed) {
            // Sender is dropped only as the intake task returns
            if let Ok(Err(intake_error)) = intake.await {
                error!("Serial intake failed: {}", intake_error);
            }
        } else {
            intake.abort();
        }
        error!("Acquisition stopped: {}", e);
        return Err(e.into());
    }

    intake.abort();
    Ok(())
}
