//! # Log Gate
//!
//! Decides which derived samples are written to the audit log.
//!
//! Under normal operation only the first sample of each UTC hour is kept,
//! which bounds the log to roughly one line per hour. Any sample whose
//! output voltage exceeds the over-voltage threshold is kept regardless.

use chrono::{DateTime, Timelike, Utc};

use super::metrics::DerivedSample;

/// Outcome of evaluating one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Nothing to persist
    Skip,
    /// Output voltage above the threshold
    OverVoltage,
    /// First sample of a new hour
    Heartbeat,
}

impl GateDecision {
    pub fn should_log(self) -> bool {
        !matches!(self, GateDecision::Skip)
    }
}

/// Hourly heartbeat / over-voltage log gate
#[derive(Debug, Clone)]
pub struct LogGate {
    previous_logged_hour: u32,
    overvoltage_threshold: f64,
}

impl LogGate {
    /// Create a gate that considers `initial_hour` already logged
    pub fn new(initial_hour: u32, overvoltage_threshold: f64) -> Self {
        Self {
            previous_logged_hour: initial_hour,
            overvoltage_threshold,
        }
    }

    /// Create a gate seeded with the hour of `now`
    ///
    /// The first heartbeat is therefore written at the next hour boundary.
    pub fn starting_at(now: DateTime<Utc>, overvoltage_threshold: f64) -> Self {
        Self::new(now.hour(), overvoltage_threshold)
    }

    pub fn previous_logged_hour(&self) -> u32 {
        self.previous_logged_hour
    }

    /// Evaluate a sample at UTC hour-of-day `hour`
    ///
    /// Does not change state; call [`LogGate::record_logged`] once the entry
    /// has actually been written.
    pub fn evaluate(&self, sample: &DerivedSample, hour: u32) -> GateDecision {
        if sample.output_voltage > self.overvoltage_threshold {
            GateDecision::OverVoltage
        } else if hour != self.previous_logged_hour {
            GateDecision::Heartbeat
        } else {
            GateDecision::Skip
        }
    }

    /// Mark `hour` as logged
    pub fn record_logged(&mut self, hour: u32) {
        self.previous_logged_hour = hour;
    }
}
