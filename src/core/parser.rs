//! Line parser for stopwatch output
//!
//! The device reports each measurement as a single text line of the form
//! `TIME:<integer>`. Anything else on the link is ignored.

use super::event::Event;
use chrono::{DateTime, Local};
use std::num::IntErrorKind;
use thiserror::Error;

/// Prefix identifying a timing line
pub const TIME_PREFIX: &str = "TIME:";

/// Reason a line was not turned into an event
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseRejected {
    /// Line does not start with `TIME:`
    #[error("line does not start with {TIME_PREFIX}")]
    MissingPrefix,

    /// Nothing follows the prefix
    #[error("no value after {TIME_PREFIX}")]
    EmptyValue,

    /// Value is not a base-10 integer
    #[error("value {0:?} is not an integer")]
    NotAnInteger(String),

    /// Value does not fit the integer range
    #[error("value {0:?} is out of range")]
    OutOfRange(String),
}

/// Decode raw bytes as UTF-8, dropping any byte sequence that is not valid
pub fn decode_line(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;

    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                out.push_str(valid);
                break;
            }
            Err(err) => {
                let (valid, after) = rest.split_at(err.valid_up_to());
                // valid_up_to guarantees this prefix is well-formed
                if let Ok(s) = std::str::from_utf8(valid) {
                    out.push_str(s);
                }
                match err.error_len() {
                    Some(len) => rest = &after[len..],
                    // truncated sequence at the end of input
                    None => break,
                }
            }
        }
    }

    out
}

/// Parse a line received at the current local time
pub fn parse_line(line: &str) -> Result<Event, ParseRejected> {
    parse_line_at(line, Local::now())
}

/// Parse a line, stamping the event with `received_at`
///
/// Surrounding whitespace (including the line terminator) is ignored.
/// Zero and negative values are accepted.
pub fn parse_line_at(line: &str, received_at: DateTime<Local>) -> Result<Event, ParseRejected> {
    let value = line
        .trim()
        .strip_prefix(TIME_PREFIX)
        .ok_or(ParseRejected::MissingPrefix)?
        .trim();

    if value.is_empty() {
        return Err(ParseRejected::EmptyValue);
    }

    let elapsed_ms = value.parse::<i64>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
            ParseRejected::OutOfRange(value.to_string())
        }
        _ => ParseRejected::NotAnInteger(value.to_string()),
    })?;

    Ok(Event::new(elapsed_ms, received_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
    }

    #[rstest]
    #[case("TIME:1532\n", 1532)]
    #[case("TIME:0", 0)]
    #[case("TIME:-25", -25)]
    #[case("TIME:+7", 7)]
    #[case("  TIME:42\r\n", 42)]
    #[case("TIME: 99 ", 99)]
    #[case("TIME:9223372036854775807", i64::MAX)]
    fn test_accepts_time_lines(#[case] line: &str, #[case] expected: i64) {
        let event = parse_line_at(line, at()).unwrap();
        assert_eq!(event.elapsed_ms, expected);
        assert_eq!(event.timestamp, "2025-01-02 03:04:05");
    }

    #[rstest]
    #[case("HELLO\n", ParseRejected::MissingPrefix)]
    #[case("", ParseRejected::MissingPrefix)]
    #[case("time:12", ParseRejected::MissingPrefix)]
    #[case("START TIME:12", ParseRejected::MissingPrefix)]
    #[case("TIME:", ParseRejected::EmptyValue)]
    #[case("TIME:   \n", ParseRejected::EmptyValue)]
    #[case("TIME:12ab", ParseRejected::NotAnInteger("12ab".into()))]
    #[case("TIME:1.5", ParseRejected::NotAnInteger("1.5".into()))]
    #[case("TIME:0x10", ParseRejected::NotAnInteger("0x10".into()))]
    #[case(
        "TIME:99999999999999999999",
        ParseRejected::OutOfRange("99999999999999999999".into())
    )]
    fn test_rejects_other_lines(#[case] line: &str, #[case] expected: ParseRejected) {
        assert_eq!(parse_line_at(line, at()), Err(expected));
    }

    #[test]
    fn test_decode_valid_utf8() {
        assert_eq!(decode_line(b"TIME:15\r\n"), "TIME:15\r\n");
    }

    #[test]
    fn test_decode_drops_invalid_bytes() {
        assert_eq!(decode_line(b"\xffTIME:\xfe15\n"), "TIME:15\n");
        assert_eq!(decode_line(b"TIME:15\xe2\x82"), "TIME:15");
        assert_eq!(decode_line(b"\x80\x81"), "");
    }

    #[test]
    fn test_garbled_line_is_still_parsed() {
        let line = decode_line(b"TIME:\xc3\x28210\n");
        // \xc3 is dropped, the following '(' survives and makes the value invalid
        assert!(matches!(
            parse_line_at(&line, at()),
            Err(ParseRejected::NotAnInteger(_))
        ));

        let line = decode_line(b"\xf0TIME:210\n");
        assert_eq!(parse_line_at(&line, at()).unwrap().elapsed_ms, 210);
    }
}
