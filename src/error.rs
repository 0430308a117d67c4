//! # Error Types
//!
//! Custom error types for the generator monitor using `thiserror`.

use thiserror::Error;

/// Main error type for the generator monitor
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial transport errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// Serial port could not be opened after every attempt
    #[error("Serial port unavailable: {0}")]
    SerialPortUnavailable(String),

    /// I2C environment sensor transaction failed
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// Serial intake task stopped delivering telemetry lines
    #[error("Serial intake closed")]
    IntakeClosed,
}

/// Result type alias for the generator monitor
pub type Result<T> = std::result::Result<T, MonitorError>;
