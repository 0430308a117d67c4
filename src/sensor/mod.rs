//! # Environment Sensor Module
//!
//! Temperature and humidity from the I2C sensor mounted in the generator
//! enclosure.
//!
//! Each reading is a fixed two-phase transaction:
//! 1. Write the measurement opcode and the high-repeatability sub-command
//! 2. Wait for the conversion to settle (500 ms by default)
//! 3. Read six bytes: temperature MSB/LSB/CRC, humidity MSB/LSB/CRC
//!
//! The CRC bytes are not checked.

pub mod bus;

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::SensorConfig;
use crate::error::{MonitorError, Result};
use bus::SensorBus;

/// Length of a measurement response
pub const MEASUREMENT_LENGTH: u8 = 6;

/// Full scale of the raw 16-bit codes
const RAW_FULL_SCALE: f64 = 65535.0;

/// One temperature/humidity measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    /// Temperature in °C
    pub temperature_celsius: f64,

    /// Relative humidity in %
    pub relative_humidity_percent: f64,
}

/// Decode a six-byte measurement response
///
/// # Arguments
///
/// * `data` - Response bytes; only `[0..2]` and `[3..5]` are used
///
/// # Errors
///
/// Returns error if fewer than six bytes were read
pub fn decode_measurement(data: &[u8]) -> Result<SensorReading> {
    if data.len() < MEASUREMENT_LENGTH as usize {
        return Err(MonitorError::Sensor(format!(
            "Measurement too short: expected {} bytes, got {}",
            MEASUREMENT_LENGTH,
            data.len()
        )));
    }

    let raw_temperature = u16::from_be_bytes([data[0], data[1]]) as f64;
    let raw_humidity = u16::from_be_bytes([data[3], data[4]]) as f64;

    Ok(SensorReading {
        temperature_celsius: raw_temperature * 175.0 / RAW_FULL_SCALE - 45.0,
        relative_humidity_percent: 100.0 * raw_humidity / RAW_FULL_SCALE,
    })
}

/// Runs the measurement protocol against a sensor bus
#[derive(Debug)]
pub struct SensorReader<B> {
    bus: B,
    measure_command: u8,
    repeatability: u8,
    data_register: u8,
    settle: Duration,
    retries: u32,
}

impl<B: SensorBus> SensorReader<B> {
    pub fn new(bus: B, config: &SensorConfig) -> Self {
        Self {
            bus,
            measure_command: config.measure_command,
            repeatability: config.repeatability,
            data_register: config.data_register,
            settle: Duration::from_millis(config.settle_ms),
            retries: config.retries,
        }
    }

    /// Take one measurement
    ///
    /// With the default of zero retries the first bus failure is returned
    /// to the caller, which treats it as fatal.
    ///
    /// # Errors
    ///
    /// Returns the last error if every attempt failed
    pub async fn read(&mut self) -> Result<SensorReading> {
        let mut attempt = 0;
        loop {
            match self.read_once().await {
                Ok(reading) => return Ok(reading),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!("Sensor read failed ({}), retry {}/{}", e, attempt, self.retries);
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn read_once(&mut self) -> Result<SensorReading> {
        self.bus.write_command(self.measure_command, &[self.repeatability])?;

        // Blocks only this task; serial intake keeps draining meanwhile
        tokio::time::sleep(self.settle).await;

        let data = self.bus.read_block(self.data_register, MEASUREMENT_LENGTH)?;
        let reading = decode_measurement(&data)?;

        debug!(
            "Sensor: {:.1}°C {:.1}%RH",
            reading.temperature_celsius, reading.relative_humidity_percent
        );
        Ok(reading)
    }
}
