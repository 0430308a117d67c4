//! # Telemetry Line Parser
//!
//! Splits a telemetry line into its four numeric fields.

use super::protocol::*;
use thiserror::Error;

/// Why a telemetry line produced no sample
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Line did not have exactly four fields
    #[error("expected 4 fields, found {found}")]
    FieldCount { found: usize },

    /// A field did not parse as a number
    #[error("{field} is not a number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

/// Parse a telemetry line
///
/// # Arguments
///
/// * `line` - Record text without the sentinel; surrounding whitespace and
///   the terminator are ignored
///
/// # Returns
///
/// * `Result<TelemetrySample, ParseError>` - Sample, or the reason the line was rejected
///
/// # Errors
///
/// Returns error if:
/// - The line does not split into exactly four whitespace-separated fields
/// - Any field is not a decimal number
pub fn parse_line(line: &str) -> Result<TelemetrySample, ParseError> {
    let line = line.strip_prefix(FRAME_SENTINEL).unwrap_or(line);
    let fields: Vec<&str> = line.split_whitespace().collect();

    if fields.len() != TELEMETRY_FIELD_COUNT {
        return Err(ParseError::FieldCount { found: fields.len() });
    }

    let mut values = [0.0f64; TELEMETRY_FIELD_COUNT];
    for (i, (field, name)) in fields.iter().zip(TELEMETRY_FIELD_NAMES).enumerate() {
        values[i] = field.parse::<f64>().map_err(|_| ParseError::InvalidNumber {
            field: name,
            value: field.to_string(),
        })?;
    }

    Ok(TelemetrySample {
        output_voltage: values[0],
        frequency: values[1],
        current: values[2],
        battery_voltage: values[3],
    })
}

impl TelemetryLine {
    /// Parse this line into a sample
    pub fn parse(&self) -> Result<TelemetrySample, ParseError> {
        parse_line(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_line() {
        let sample = parse_line("231.4 50.02 12.5 13.1\n").unwrap();
        assert_eq!(sample.output_voltage, 231.4);
        assert_eq!(sample.frequency, 50.02);
        assert_eq!(sample.current, 12.5);
        assert_eq!(sample.battery_voltage, 13.1);
    }

    #[test]
    fn test_parse_tolerates_extra_whitespace() {
        let sample = parse_line("  1.0\t2.0  3.0 4.0 \r\n").unwrap();
        assert_eq!(sample.battery_voltage, 4.0);
    }

    #[test]
    fn test_parse_strips_sentinel() {
        let sample = parse_line("!1.0 2.0 3.0 4.0\n").unwrap();
        assert_eq!(sample.output_voltage, 1.0);
    }

    #[test]
    fn test_parse_integers() {
        let sample = parse_line("0 0 0 12").unwrap();
        assert_eq!(sample.output_voltage, 0.0);
        assert_eq!(sample.battery_voltage, 12.0);
    }

    #[test]
    fn test_three_fields_rejected() {
        assert_eq!(
            parse_line("1.0 2.0 3.0\n"),
            Err(ParseError::FieldCount { found: 3 })
        );
    }

    #[test]
    fn test_five_fields_rejected() {
        assert_eq!(
            parse_line("1.0 2.0 3.0 4.0 5.0\n"),
            Err(ParseError::FieldCount { found: 5 })
        );
    }

    #[test]
    fn test_empty_line_rejected() {
        assert_eq!(parse_line("\n"), Err(ParseError::FieldCount { found: 0 }));
    }

    #[test]
    fn test_non_numeric_field_rejected() {
        let err = parse_line("230.0 50.0 abc 13.0\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidNumber {
                field: "current",
                value: "abc".to_string(),
            }
        );
        assert!(err.to_string().contains("current"));
    }

    #[test]
    fn test_telemetry_line_parse() {
        let line = TelemetryLine::new("5.0 6.0 7.0 8.0\n");
        let sample = line.parse().unwrap();
        assert_eq!(sample.current, 7.0);
    }

    #[test]
    fn test_field_count_message() {
        let err = ParseError::FieldCount { found: 2 };
        assert_eq!(err.to_string(), "expected 4 fields, found 2");
    }
}
