//! # Telemetry Frame Decoder
//!
//! Turns the raw serial byte stream into complete telemetry lines.
//!
//! The decoder is a two-state machine. In `Idle` everything except the
//! sentinel is discarded; in `Receiving` every character is buffered until
//! the terminator arrives. A byte that is not valid text drops the partial
//! frame and returns the decoder to `Idle`, so it resynchronizes on the next
//! sentinel instead of concatenating garbage into a record.

use super::protocol::*;
use tracing::trace;

/// Receive state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Waiting for a sentinel
    Idle,
    /// Accumulating a record
    Receiving,
}

/// Sentinel-framed line decoder
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecoderState,
    buffer: String,
    max_line_length: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LENGTH)
    }
}

impl FrameDecoder {
    /// Create a decoder in the `Idle` state
    ///
    /// # Arguments
    ///
    /// * `max_line_length` - Frames longer than this (terminator included)
    ///   are dropped and the decoder returns to `Idle`
    pub fn new(max_line_length: usize) -> Self {
        Self {
            state: DecoderState::Idle,
            buffer: String::with_capacity(max_line_length),
            max_line_length,
        }
    }

    /// Current receive state
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Feed one raw byte from the transport
    ///
    /// Bytes outside the ASCII range cannot decode to a character on their
    /// own and are treated as a decode failure.
    ///
    /// # Returns
    ///
    /// * `Option<TelemetryLine>` - A complete line if this byte terminated one
    pub fn push_byte(&mut self, byte: u8) -> Option<TelemetryLine> {
        if byte.is_ascii() {
            self.push_char(byte as char)
        } else {
            trace!("Undecodable byte 0x{:02X}, resynchronizing", byte);
            self.decode_failure();
            None
        }
    }

    /// Feed one decoded character
    pub fn push_char(&mut self, c: char) -> Option<TelemetryLine> {
        match self.state {
            DecoderState::Idle => {
                if c == FRAME_SENTINEL {
                    self.buffer.clear();
                    self.state = DecoderState::Receiving;
                }
                None
            }
            DecoderState::Receiving => {
                self.buffer.push(c);

                if c == FRAME_TERMINATOR {
                    self.state = DecoderState::Idle;
                    return Some(TelemetryLine::new(std::mem::take(&mut self.buffer)));
                }

                if self.buffer.len() >= self.max_line_length {
                    trace!("Frame exceeded {} bytes without terminator, dropping", self.max_line_length);
                    self.decode_failure();
                }
                None
            }
        }
    }

    /// Signal that the next input could not be decoded
    ///
    /// Drops any partial frame and returns to `Idle`.
    pub fn decode_failure(&mut self) {
        self.buffer.clear();
        self.state = DecoderState::Idle;
    }

    /// Feed a chunk of raw bytes, collecting every line it completes
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<TelemetryLine> {
        bytes.iter().filter_map(|&b| self.push_byte(b)).collect()
    }
}
