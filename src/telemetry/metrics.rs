//! # Derived Metrics
//!
//! Combines generator telemetry with the enclosure reading.

use crate::config::MetricsConfig;
use crate::frame::protocol::TelemetrySample;
use crate::sensor::SensorReading;

/// Telemetry after denoising, plus the environment reading and computed power
///
/// This is the unit handed to the renderer and, when the gate allows it,
/// to the audit log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedSample {
    /// Output voltage in volts (0.0 below the voltage floor)
    pub output_voltage: f64,

    /// Output frequency in Hz
    pub frequency: f64,

    /// Load current in amperes (0.0 below the current floor)
    pub current: f64,

    /// Output power in watts
    pub power: f64,

    /// Starter battery voltage in volts
    pub battery_voltage: f64,

    /// Enclosure temperature in °C
    pub temperature_celsius: f64,

    /// Enclosure relative humidity in %
    pub relative_humidity_percent: f64,
}

/// Treat `value` as zero when it is below `floor`
fn denoise(value: f64, floor: f64) -> f64 {
    if value < floor {
        0.0
    } else {
        value
    }
}

/// Apply the denoise clamps and compute power
///
/// # Examples
///
/// ```
/// use generator_monitor::config::MetricsConfig;
/// use generator_monitor::frame::protocol::TelemetrySample;
/// use generator_monitor::sensor::SensorReading;
/// use generator_monitor::telemetry::metrics::derive;
///
/// let sample = TelemetrySample { output_voltage: 230.0, frequency: 50.0, current: 10.0, battery_voltage: 13.2 };
/// let reading = SensorReading { temperature_celsius: 21.0, relative_humidity_percent: 40.0 };
///
/// let derived = derive(&sample, &reading, &MetricsConfig::default());
/// assert_eq!(derived.power, 2300.0);
/// ```
pub fn derive(
    sample: &TelemetrySample,
    reading: &SensorReading,
    config: &MetricsConfig,
) -> DerivedSample {
    let output_voltage = denoise(sample.output_voltage, config.voltage_floor);
    let current = denoise(sample.current, config.current_floor);

    DerivedSample {
        output_voltage,
        frequency: sample.frequency,
        current,
        power: output_voltage * current,
        battery_voltage: sample.battery_voltage,
        temperature_celsius: reading.temperature_celsius,
        relative_humidity_percent: reading.relative_humidity_percent,
    }
}
