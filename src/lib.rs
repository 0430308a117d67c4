//! # Generator Monitor Library
//!
//! Telemetry daemon for a standby generator.
//!
//! This library reads the generator controller's sentinel-framed serial
//! telemetry, samples an I2C temperature/humidity sensor in the enclosure,
//! publishes static HTML status pages and keeps an hourly audit log that
//! also captures every over-voltage event.

pub mod config;
pub mod error;
pub mod frame;
pub mod sensor;
pub mod telemetry;
pub mod render;
pub mod serial;
pub mod acquisition;
