//! Common types used throughout stitch-query
//!
//! This module contains shared type definitions, type aliases,
//! and the [`Record`] type returned by every query engine.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// Well-known fields
// ============================================================================

/// Creation timestamp field, used as the super-stitch cursor
pub const CREATED_AT: &str = "createdAt";

/// Object identifier field
pub const OBJECT_ID: &str = "objectId";

// ============================================================================
// Record
// ============================================================================

/// A single result object returned by a query engine
///
/// Records are opaque JSON objects. The stitcher only ever looks at
/// `createdAt`, and only while super-stitching.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(JsonObject);

impl Record {
    /// Create a record from a JSON object
    pub fn new(fields: JsonObject) -> Self {
        Self(fields)
    }

    /// Create a record from a JSON value, if it is an object
    pub fn from_value(value: JsonValue) -> Option<Self> {
        match value {
            JsonValue::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Get a field value
    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.0.get(field)
    }

    /// Set a field value
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<JsonValue>) {
        self.0.insert(field.into(), value.into());
    }

    /// The `objectId` of this record, if present
    pub fn object_id(&self) -> Option<&str> {
        self.0.get(OBJECT_ID).and_then(JsonValue::as_str)
    }

    /// The `createdAt` timestamp of this record, if present and parseable
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.0.get(CREATED_AT).and_then(parse_date)
    }

    /// Borrow the underlying JSON object
    pub fn as_object(&self) -> &JsonObject {
        &self.0
    }

    /// Consume the record, returning the underlying JSON object
    pub fn into_inner(self) -> JsonObject {
        self.0
    }
}

impl From<JsonObject> for Record {
    fn from(fields: JsonObject) -> Self {
        Self(fields)
    }
}

impl From<Record> for JsonValue {
    fn from(record: Record) -> Self {
        JsonValue::Object(record.0)
    }
}

// ============================================================================
// Date encoding
// ============================================================================

/// Parse a date from either an RFC 3339 string or a Parse date object
/// (`{"__type": "Date", "iso": "..."}`)
pub fn parse_date(value: &JsonValue) -> Option<DateTime<Utc>> {
    let iso = match value {
        JsonValue::String(s) => s.as_str(),
        JsonValue::Object(map) => {
            if map.get("__type").and_then(JsonValue::as_str) != Some("Date") {
                return None;
            }
            map.get("iso")?.as_str()?
        }
        _ => return None,
    };

    DateTime::parse_from_rfc3339(iso)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format a timestamp the way Parse stores it (millisecond precision, `Z`)
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Encode a timestamp as a Parse date object for use in query constraints
///
/// Millisecond timestamps keep the Parse shape; finer ones keep every
/// sub-second digit so the encoded value compares equal to the original.
pub fn encode_date(date: &DateTime<Utc>) -> JsonValue {
    let format = if date.timestamp_subsec_nanos() % 1_000_000 == 0 {
        SecondsFormat::Millis
    } else {
        SecondsFormat::AutoSi
    };
    json!({
        "__type": "Date",
        "iso": date.to_rfc3339_opts(format, true),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_accessors() {
        let record = Record::from_value(json!({
            "objectId": "abc123",
            "createdAt": "2024-03-01T12:00:00.250Z",
            "score": 7
        }))
        .unwrap();

        assert_eq!(record.object_id(), Some("abc123"));
        assert_eq!(record.get("score"), Some(&json!(7)));
        assert_eq!(
            record.created_at(),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
                + chrono::Duration::milliseconds(250))
        );
    }

    #[test]
    fn test_record_from_non_object() {
        assert!(Record::from_value(json!([1, 2, 3])).is_none());
        assert!(Record::from_value(json!("text")).is_none());
    }

    #[test]
    fn test_parse_date_object() {
        let value = json!({"__type": "Date", "iso": "2023-01-02T03:04:05.006Z"});
        let date = parse_date(&value).unwrap();
        assert_eq!(format_date(&date), "2023-01-02T03:04:05.006Z");

        let wrong_type = json!({"__type": "Pointer", "iso": "2023-01-02T03:04:05.006Z"});
        assert!(parse_date(&wrong_type).is_none());
        assert!(parse_date(&json!(12345)).is_none());
        assert!(parse_date(&json!("not a date")).is_none());
    }

    #[test]
    fn test_encode_date() {
        let date = Utc.with_ymd_and_hms(2022, 6, 30, 23, 59, 59).unwrap();
        assert_eq!(
            encode_date(&date),
            json!({"__type": "Date", "iso": "2022-06-30T23:59:59.000Z"})
        );
    }

    #[test]
    fn test_encode_date_keeps_sub_millisecond_precision() {
        let value = json!("2024-05-01T00:00:00.000105Z");
        let date = parse_date(&value).unwrap();

        let encoded = encode_date(&date);
        assert_eq!(encoded["iso"], "2024-05-01T00:00:00.000105Z");
        assert_eq!(parse_date(&encoded), Some(date));
    }

    #[test]
    fn test_record_missing_created_at() {
        let record = Record::from_value(json!({"objectId": "x"})).unwrap();
        assert!(record.created_at().is_none());
    }
}
