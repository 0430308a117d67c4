//! # Telemetry Protocol Constants and Types
//!
//! Core protocol definitions for the controller's ASCII telemetry stream.

/// Start-of-record sentinel
pub const FRAME_SENTINEL: char = '!';

/// End-of-record terminator
pub const FRAME_TERMINATOR: char = '\n';

/// Number of whitespace-separated fields in every record
pub const TELEMETRY_FIELD_COUNT: usize = 4;

/// Field names in wire order
pub const TELEMETRY_FIELD_NAMES: [&str; TELEMETRY_FIELD_COUNT] =
    ["output_voltage", "frequency", "current", "battery_voltage"];

/// Default upper bound on a frame's length before the decoder gives up on it
pub const DEFAULT_MAX_LINE_LENGTH: usize = 256;

/// One complete telemetry record as received, sentinel stripped and
/// terminator retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryLine(String);

impl TelemetryLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TelemetryLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.trim_end())
    }
}

/// Parsed generator telemetry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    /// Generator output voltage in volts
    pub output_voltage: f64,

    /// Output frequency in Hz
    pub frequency: f64,

    /// Load current in amperes
    pub current: f64,

    /// Starter battery voltage in volts
    pub battery_voltage: f64,
}
