//! # Telemetry Framing Module
//!
//! Implementation of the generator controller's serial telemetry protocol.
//!
//! Each record on the wire is ASCII text framed by a start sentinel and a
//! newline terminator:
//!
//! ```text
//! !<output voltage> <frequency> <current> <battery voltage>\n
//! ```
//!
//! This module handles:
//! - Frame synchronization and recovery from line noise
//! - Splitting and validating the four numeric fields

pub mod protocol;
pub mod decoder;
pub mod parser;
