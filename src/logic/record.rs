//! Record Parser
//!
//! Filters decoded lines down to JSON object records.
//! Rejections are never fatal: the caller logs them and moves on.

use serde_json::{Map, Value};
use thiserror::Error;

/// One decoded sensor frame
///
/// Unknown fields are kept but never consulted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SensorRecord {
    fields: Map<String, Value>,
}

impl SensorRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Numeric value of a field.
    ///
    /// Only JSON numbers count: `"1"` or `true` never satisfy a sensor rule.
    pub fn number(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(Value::as_f64)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl From<Map<String, Value>> for SensorRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

/// Why a line did not produce a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordRejected {
    /// Line is not wrapped in `{ ... }`; never handed to the JSON decoder
    #[error("non-JSON or incomplete line: {line}")]
    NonJson { line: String },

    /// Looked like JSON but did not decode to an object
    #[error("malformed JSON line `{line}`: {reason}")]
    Malformed { line: String, reason: String },
}

impl RecordRejected {
    pub fn line(&self) -> &str {
        match self {
            Self::NonJson { line } | Self::Malformed { line, .. } => line,
        }
    }
}

/// Parse one trimmed line.
///
/// `Ok(None)` means the line was empty and is skipped silently.
pub fn parse_line(line: &str) -> Result<Option<SensorRecord>, RecordRejected> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    // Cheap pre-filter before the decoder
    if !(line.starts_with('{') && line.ends_with('}')) {
        return Err(RecordRejected::NonJson {
            line: line.to_string(),
        });
    }

    serde_json::from_str::<Map<String, Value>>(line)
        .map(|fields| Some(SensorRecord::new(fields)))
        .map_err(|e| RecordRejected::Malformed {
            line: line.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_record() {
        let record = parse_line(r#"{"water1": 1801, "vibration": 0, "fw": "v2"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(record.number("water1"), Some(1801.0));
        assert_eq!(record.number("vibration"), Some(0.0));
        assert_eq!(record.number("fw"), None);
        assert!(record.contains("fw"));
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn test_empty_line_is_skipped() {
        assert_eq!(parse_line(""), Ok(None));
        assert_eq!(parse_line("   \t"), Ok(None));
    }

    #[test]
    fn test_non_json_line_rejected_without_parse() {
        for line in ["ESP32 boot ok", "{\"water1\": 12", "\"water1\": 12}", "[1,2]"] {
            match parse_line(line) {
                Err(RecordRejected::NonJson { line: rejected }) => assert_eq!(rejected, line),
                other => panic!("expected NonJson for {:?}, got {:?}", line, other),
            }
        }
    }

    #[test]
    fn test_malformed_json_rejected() {
        let result = parse_line(r#"{"water1": }"#);
        match result {
            Err(RecordRejected::Malformed { line, reason }) => {
                assert_eq!(line, r#"{"water1": }"#);
                assert!(!reason.is_empty());
            }
            other => panic!("expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_bool_and_string_values_are_not_numbers() {
        let record = parse_line(r#"{"tilt1": true, "tilt2": "1"}"#).unwrap().unwrap();
        assert_eq!(record.number("tilt1"), None);
        assert_eq!(record.number("tilt2"), None);
    }

    #[test]
    fn test_rejection_display() {
        let err = parse_line("hello").unwrap_err();
        assert_eq!(err.to_string(), "non-JSON or incomplete line: hello");
        assert_eq!(err.line(), "hello");
    }
}
