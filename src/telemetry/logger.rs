//! # Audit Log
//!
//! Append-only, human-readable record of gated samples. One line per entry:
//!
//! ```text
//! 2024-10-28-13-00-00.000000 utc: voltage = 230.00 frequency = 50.00 power(W) = 2300.00 battery voltage = 13.20 temperature(C) = 21.0 humidity = 40.0
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::metrics::DerivedSample;
use crate::error::Result;

/// Timestamp layout for entry prefixes
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S%.6f";

/// Format the message body for a sample
pub fn format_message(sample: &DerivedSample) -> String {
    format!(
        "voltage = {:.2} frequency = {:.2} power(W) = {:.2} battery voltage = {:.2} temperature(C) = {:.1} humidity = {:.1}",
        sample.output_voltage,
        sample.frequency,
        sample.power,
        sample.battery_voltage,
        sample.temperature_celsius,
        sample.relative_humidity_percent,
    )
}

/// Format a complete log line, terminator included
pub fn format_entry(message: &str, timestamp: DateTime<Utc>) -> String {
    format!("{} utc: {}\n", timestamp.format(TIMESTAMP_FORMAT), message)
}

/// Append-only audit log file
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry
    ///
    /// The file is opened, written and closed on every call, so nothing is
    /// held open between the hourly writes.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or written
    pub fn append(&self, message: &str, timestamp: DateTime<Utc>) -> Result<()> {
        let entry = format_entry(message, timestamp);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.as_bytes())?;

        debug!("Appended audit entry to {}", self.path.display());
        Ok(())
    }

    /// Append the entry for a derived sample
    pub fn append_sample(&self, sample: &DerivedSample, timestamp: DateTime<Utc>) -> Result<()> {
        self.append(&format_message(sample), timestamp)
    }
}
