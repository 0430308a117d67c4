//! # Serial Communication Module
//!
//! Handles the telemetry link from the generator's controller board.
//!
//! This module handles:
//! - Opening the serial port (8N1, no flow control) with retry
//! - Draining the port on a dedicated task so bytes are never left in the
//!   UART while the sensor conversion settles
//! - Handing complete telemetry lines to the acquisition loop

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::config::SerialConfig;
use crate::error::{MonitorError, Result};
use crate::frame::decoder::FrameDecoder;
use crate::frame::protocol::TelemetryLine;

/// Bytes requested from the port per read
const READ_BUFFER_SIZE: usize = 256;

/// Telemetry serial port handle
pub struct TelemetrySerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyAMA0)
    device_path: String,
}

impl std::fmt::Debug for TelemetrySerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetrySerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl TelemetrySerial {
    /// Open the telemetry port, retrying on failure
    ///
    /// Makes `open_attempts` attempts, `reconnect_interval_ms` apart.
    ///
    /// # Errors
    ///
    /// Returns `SerialPortUnavailable` if every attempt fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use generator_monitor::config::SerialConfig;
    /// use generator_monitor::serial::TelemetrySerial;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let serial = TelemetrySerial::open(&SerialConfig::default()).await?;
    ///     println!("Connected to: {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub async fn open(config: &SerialConfig) -> Result<Self> {
        let retry_interval = Duration::from_millis(config.reconnect_interval_ms);
        let mut last_error = String::new();

        for attempt in 1..=config.open_attempts {
            debug!("Opening serial port {} (attempt {}/{})", config.port, attempt, config.open_attempts);

            match Self::open_port(&config.port, config.baud_rate) {
                Ok(port) => {
                    info!("Opened telemetry port {} at {} baud", config.port, config.baud_rate);
                    return Ok(Self {
                        port,
                        device_path: config.port.clone(),
                    });
                }
                Err(e) => {
                    warn!("{}", e);
                    last_error = e.to_string();
                    if attempt < config.open_attempts {
                        tokio::time::sleep(retry_interval).await;
                    }
                }
            }
        }

        Err(MonitorError::SerialPortUnavailable(format!(
            "{} after {} attempts: {}",
            config.port, config.open_attempts, last_error
        )))
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| MonitorError::Serial(format!("Failed to open {}: {}", path, e)))
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Take the underlying async stream
    pub fn into_stream(self) -> tokio_serial::SerialStream {
        self.port
    }
}

/// Drain `port` through `decoder`, forwarding complete lines to `lines`
///
/// Lines are offered without waiting: if the acquisition loop is still
/// busy with earlier lines and the queue is full, the new line is dropped,
/// since the controller sends a fresh record every period anyway.
///
/// Returns `Ok(())` on end of stream or once the receiver is gone.
///
/// # Errors
///
/// Returns error if reading from the port fails
pub async fn run_intake<R>(
    mut port: R,
    mut decoder: FrameDecoder,
    lines: mpsc::Sender<TelemetryLine>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);

    loop {
        buf.clear();
        let n = port
            .read_buf(&mut buf)
            .await
            .map_err(|e| MonitorError::Serial(format!("Read failed: {}", e)))?;

        if n == 0 {
            info!("Serial stream reached end of file");
            return Ok(());
        }

        for line in decoder.feed(&buf) {
            match lines.try_send(line) {
                Ok(()) => {}
                Err(TrySendError::Full(line)) => {
                    warn!("Line queue full, dropping telemetry \"{}\"", line);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Line receiver dropped, stopping intake");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    fn config_for(port: &str) -> SerialConfig {
        SerialConfig {
            port: port.to_string(),
            reconnect_interval_ms: 1,
            open_attempts: 2,
            ..SerialConfig::default()
        }
    }

    #[tokio::test]
    async fn test_open_with_invalid_path_returns_error() {
        let result = TelemetrySerial::open(&config_for("/dev/nonexistent_serial_device_12345")).await;

        match result {
            Err(MonitorError::SerialPortUnavailable(msg)) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("2 attempts"));
            }
            other => panic!("Expected SerialPortUnavailable error, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_port_with_invalid_path_returns_error() {
        let result = TelemetrySerial::open_port("/dev/nonexistent_serial_device_12345", 115200);

        match result {
            Err(MonitorError::Serial(msg)) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_intake_forwards_lines() {
        let port = Builder::new()
            .read(b"!230.0 50.0 10.0 13.")
            .read(b"2\nnoise!1 2 3 4\n")
            .build();
        let (tx, mut rx) = mpsc::channel(8);

        run_intake(port, FrameDecoder::default(), tx).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().as_str(), "230.0 50.0 10.0 13.2\n");
        assert_eq!(rx.recv().await.unwrap().as_str(), "1 2 3 4\n");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_intake_resyncs_on_invalid_byte() {
        let port = Builder::new()
            .read(b"!1.0 2")
            .read(&[0xFE])
            .read(b"!5.0 6.0 7.0 8.0\n")
            .build();
        let (tx, mut rx) = mpsc::channel(8);

        run_intake(port, FrameDecoder::default(), tx).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().as_str(), "5.0 6.0 7.0 8.0\n");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_intake_drops_lines_when_queue_full() {
        let port = Builder::new().read(b"!1 1 1 1\n!2 2 2 2\n!3 3 3 3\n").build();
        let (tx, mut rx) = mpsc::channel(1);

        run_intake(port, FrameDecoder::default(), tx).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().as_str(), "1 1 1 1\n");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_intake_stops_when_receiver_dropped() {
        let port = Builder::new().read(b"!1 1 1 1\n").build();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        assert!(run_intake(port, FrameDecoder::default(), tx).await.is_ok());
    }

    #[tokio::test]
    async fn test_intake_read_error() {
        let port = Builder::new()
            .read_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged"))
            .build();
        let (tx, _rx) = mpsc::channel(1);

        let result = run_intake(port, FrameDecoder::default(), tx).await;
        match result {
            Err(MonitorError::Serial(msg)) => assert!(msg.contains("unplugged")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    // Integration test - only runs if the controller is connected
    #[tokio::test]
    #[ignore] // Run with: cargo test -- --ignored
    async fn test_open_with_real_hardware() {
        match TelemetrySerial::open(&SerialConfig::default()).await {
            Ok(serial) => println!("Opened telemetry port at: {}", serial.device_path()),
            Err(e) => println!("No telemetry hardware detected (this is OK for CI/CD): {}", e),
        }
    }
}
