//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field carries a default, so an empty file (or no file at all)
//! yields the stock deployment: telemetry on `/dev/ttyAMA0` at 115200 baud,
//! an SHT3x-style sensor at 0x44 on `/dev/i2c-1`, and status pages under
//! `/var/www/html`.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::{MonitorError, Result};

/// Baud rates accepted for the telemetry link
const SUPPORTED_BAUD_RATES: &[u32] = &[9600, 19200, 38400, 57600, 115200, 230400];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

/// Serial telemetry link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    #[serde(default = "default_open_attempts")]
    pub open_attempts: u32,

    #[serde(default = "default_line_queue_capacity")]
    pub line_queue_capacity: usize,

    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

/// I2C environment sensor configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SensorConfig {
    #[serde(default = "default_i2c_bus")]
    pub bus: String,

    #[serde(default = "default_i2c_address")]
    pub address: u16,

    #[serde(default = "default_measure_command")]
    pub measure_command: u8,

    #[serde(default = "default_repeatability")]
    pub repeatability: u8,

    #[serde(default = "default_data_register")]
    pub data_register: u8,

    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    #[serde(default)]
    pub retries: u32,
}

/// Denoise clamp thresholds
#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_voltage_floor")]
    pub voltage_floor: f64,

    #[serde(default = "default_current_floor")]
    pub current_floor: f64,
}

/// Audit log and diagnostics configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_path")]
    pub path: String,

    #[serde(default = "default_overvoltage_threshold")]
    pub overvoltage_threshold: f64,

    #[serde(default)]
    pub diagnostics_dir: Option<String>,
}

/// Status document configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    #[serde(default = "default_standard_path")]
    pub standard_path: String,

    #[serde(default = "default_mobile_path")]
    pub mobile_path: String,

    #[serde(default)]
    pub chart_path: Option<String>,

    #[serde(default = "default_chart_capacity")]
    pub chart_capacity: usize,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyAMA0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_reconnect_interval_ms() -> u64 { 1000 }
fn default_open_attempts() -> u32 { 5 }
fn default_line_queue_capacity() -> usize { 16 }
fn default_max_line_length() -> usize { 256 }

fn default_i2c_bus() -> String { "/dev/i2c-1".to_string() }
fn default_i2c_address() -> u16 { 0x44 }
fn default_measure_command() -> u8 { 0x2C }
fn default_repeatability() -> u8 { 0x06 }
fn default_data_register() -> u8 { 0x00 }
fn default_settle_ms() -> u64 { 500 }

fn default_voltage_floor() -> f64 { 2.0 }
fn default_current_floor() -> f64 { 0.5 }

fn default_log_path() -> String { "/var/log/generator.log".to_string() }
fn default_overvoltage_threshold() -> f64 { 100.0 }

fn default_standard_path() -> String { "/var/www/html/index.html".to_string() }
fn default_mobile_path() -> String { "/var/www/html/mobile.html".to_string() }
fn default_chart_capacity() -> usize { 168 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            open_attempts: default_open_attempts(),
            line_queue_capacity: default_line_queue_capacity(),
            max_line_length: default_max_line_length(),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            bus: default_i2c_bus(),
            address: default_i2c_address(),
            measure_command: default_measure_command(),
            repeatability: default_repeatability(),
            data_register: default_data_register(),
            settle_ms: default_settle_ms(),
            retries: 0,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            voltage_floor: default_voltage_floor(),
            current_floor: default_current_floor(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
            overvoltage_threshold: default_overvoltage_threshold(),
            diagnostics_dir: None,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            standard_path: default_standard_path(),
            mobile_path: default_mobile_path(),
            chart_path: None,
            chart_capacity: default_chart_capacity(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> MonitorError {
    MonitorError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use generator_monitor::config::Config;
    ///
    /// let config = Config::load("/etc/generator-monitor.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {:?}",
                SUPPORTED_BAUD_RATES
            )));
        }

        if self.serial.reconnect_interval_ms == 0 || self.serial.reconnect_interval_ms > 60000 {
            return Err(invalid("reconnect_interval_ms must be between 1 and 60000"));
        }

        if self.serial.open_attempts == 0 {
            return Err(invalid("open_attempts must be greater than 0"));
        }

        if self.serial.line_queue_capacity == 0 {
            return Err(invalid("line_queue_capacity must be greater than 0"));
        }

        // Shortest meaningful frame is "0 0 0 0\n"
        if self.serial.max_line_length < 8 {
            return Err(invalid("max_line_length must be at least 8"));
        }

        if self.sensor.bus.is_empty() {
            return Err(invalid("sensor bus cannot be empty"));
        }

        if self.sensor.address > 0x7F {
            return Err(invalid(format!(
                "sensor address 0x{:X} is not a 7-bit I2C address",
                self.sensor.address
            )));
        }

        if self.sensor.settle_ms > 10000 {
            return Err(invalid("settle_ms must be at most 10000"));
        }

        for (name, value) in [
            ("voltage_floor", self.metrics.voltage_floor),
            ("current_floor", self.metrics.current_floor),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{} must be a non-negative number", name)));
            }
        }

        if self.log.path.is_empty() {
            return Err(invalid("log path cannot be empty"));
        }

        if !self.log.overvoltage_threshold.is_finite() {
            return Err(invalid("overvoltage_threshold must be finite"));
        }

        if matches!(&self.log.diagnostics_dir, Some(dir) if dir.is_empty()) {
            return Err(invalid("diagnostics_dir cannot be empty when set"));
        }

        if self.render.standard_path.is_empty() || self.render.mobile_path.is_empty() {
            return Err(invalid("render paths cannot be empty"));
        }

        if let Some(chart_path) = &self.render.chart_path {
            if chart_path.is_empty() {
                return Err(invalid("chart_path cannot be empty when set"));
            }
            if self.render.chart_capacity == 0 {
                return Err(invalid("chart_capacity must be greater than 0 when a chart is enabled"));
            }
        }

        Ok(())
    }
}
