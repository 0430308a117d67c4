//! # Telemetry Module
//!
//! Turns parsed telemetry into derived samples and decides which of them
//! are persisted.
//!
//! This module handles:
//! - Denoising near-zero voltage/current readings and computing power
//! - Gating audit-log writes to one per hour plus every over-voltage event
//! - Appending timestamped entries to the audit log

pub mod metrics;
pub mod gate;
pub mod logger;
