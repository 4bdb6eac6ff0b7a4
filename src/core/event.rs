//! Timing event produced from a device line

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Wall-clock format used for event timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One parsed timing measurement ready for delivery
///
/// Serializes to the collector's wire shape:
/// `{"timestamp": "YYYY-MM-DD HH:MM:SS", "elapsedTimeMs": <integer>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Local time at which the line was received
    pub timestamp: String,
    /// Elapsed time reported by the device, in milliseconds
    #[serde(rename = "elapsedTimeMs")]
    pub elapsed_ms: i64,
}

impl Event {
    /// Create an event stamped with the given receipt time
    pub fn new(elapsed_ms: i64, received_at: DateTime<Local>) -> Self {
        Self {
            timestamp: received_at.format(TIMESTAMP_FORMAT).to_string(),
            elapsed_ms,
        }
    }

    /// Create an event stamped with the current local time
    pub fn now(elapsed_ms: i64) -> Self {
        Self::new(elapsed_ms, Local::now())
    }

    /// Serialize to the JSON document posted to the collector
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let event = Event::new(1532, at);
        assert_eq!(event.timestamp, "2024-03-09 07:05:01");
        assert_eq!(event.elapsed_ms, 1532);
    }

    #[test]
    fn test_wire_field_names() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let json = Event::new(1532, at).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["timestamp"], "2024-03-09 07:05:01");
        assert_eq!(value["elapsedTimeMs"], 1532);
        assert!(value.get("elapsed_ms").is_none());
    }

    #[test]
    fn test_collector_side_decode() {
        let body = r#"{"timestamp":"2024-03-09 07:05:01","elapsedTimeMs":-4}"#;
        let event: Event = serde_json::from_str(body).unwrap();
        assert_eq!(event.elapsed_ms, -4);
        assert_eq!(event.timestamp, "2024-03-09 07:05:01");
    }
}
