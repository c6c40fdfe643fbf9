// Object-change notification envelope
use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::constants;

/// Kind of change reported by the object store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Removed,
}

/// Event timestamp as it appears on the wire
///
/// Object stores disagree on the format: some send RFC 3339 strings, some
/// integer epoch milliseconds. Both are accepted; `as_millis` normalizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventTime {
    Millis(i64),
    Rfc3339(String),
}

impl EventTime {
    pub fn as_millis(&self) -> Result<i64, chrono::ParseError> {
        match self {
            EventTime::Millis(ms) => Ok(*ms),
            EventTime::Rfc3339(s) => Ok(DateTime::parse_from_rfc3339(s)?.timestamp_millis()),
        }
    }
}

/// One object-change notification
///
/// Delivery is at-least-once and unordered with respect to `event_time`;
/// `delivery_id` is the dedup handle. `size` is present for created objects
/// and may be absent for removals, in which case the prior size has to be
/// resolved from earlier observations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectChangeEvent {
    pub bucket: String,
    pub key: String,
    pub change_type: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    pub event_time: EventTime,
    pub delivery_id: String,
}

impl ObjectChangeEvent {
    pub fn created(
        bucket: impl Into<String>,
        key: impl Into<String>,
        size: u64,
        event_time_ms: i64,
        delivery_id: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            change_type: ChangeKind::Created,
            size: Some(size),
            event_time: EventTime::Millis(event_time_ms),
            delivery_id: delivery_id.into(),
        }
    }

    pub fn removed(
        bucket: impl Into<String>,
        key: impl Into<String>,
        event_time_ms: i64,
        delivery_id: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            change_type: ChangeKind::Removed,
            size: None,
            event_time: EventTime::Millis(event_time_ms),
            delivery_id: delivery_id.into(),
        }
    }

    /// Structural validation of the envelope
    ///
    /// Returns a human-readable reason when the event cannot be applied.
    pub fn validate(&self) -> Result<(), String> {
        if !constants::validate_bucket_name(&self.bucket) {
            return Err(format!("invalid bucket name: {:?}", self.bucket));
        }
        if self.key.is_empty() {
            return Err("empty object key".to_string());
        }
        if self.delivery_id.is_empty() {
            return Err("empty delivery id".to_string());
        }
        if self.event_time.as_millis().is_err() {
            return Err("unparseable event time".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_envelope_with_millis() {
        let json = r#"{
            "bucket": "my-bucket",
            "key": "a.txt",
            "changeType": "created",
            "size": 18,
            "eventTime": 1700000000000,
            "deliveryId": "d-1"
        }"#;
        let event: ObjectChangeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.change_type, ChangeKind::Created);
        assert_eq!(event.size, Some(18));
        assert_eq!(event.event_time.as_millis().unwrap(), 1700000000000);
        assert!(event.validate().is_ok());
    }

    #[test]
    fn test_parse_envelope_with_rfc3339() {
        let json = r#"{
            "bucket": "my-bucket",
            "key": "a.txt",
            "changeType": "removed",
            "eventTime": "2024-01-01T00:00:00Z",
            "deliveryId": "d-2"
        }"#;
        let event: ObjectChangeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.change_type, ChangeKind::Removed);
        assert_eq!(event.size, None);
        assert_eq!(event.event_time.as_millis().unwrap(), 1704067200000);
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let mut event = ObjectChangeEvent::created("my-bucket", "a.txt", 1, 1, "d-1");
        assert!(event.validate().is_ok());

        event.bucket = "NOT VALID".to_string();
        assert!(event.validate().is_err());

        let mut event = ObjectChangeEvent::created("my-bucket", "a.txt", 1, 1, "d-1");
        event.key.clear();
        assert!(event.validate().is_err());

        let mut event = ObjectChangeEvent::created("my-bucket", "a.txt", 1, 1, "d-1");
        event.delivery_id.clear();
        assert!(event.validate().is_err());

        let mut event = ObjectChangeEvent::created("my-bucket", "a.txt", 1, 1, "d-1");
        event.event_time = EventTime::Rfc3339("yesterday".to_string());
        assert!(event.validate().is_err());
    }

    #[test]
    fn test_round_trip_serialization() {
        let event = ObjectChangeEvent::created("my-bucket", "a.txt", 42, 1700000000000, "d-3");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"changeType\":\"created\""));
        assert!(json.contains("\"deliveryId\":\"d-3\""));
        let back: ObjectChangeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.bucket, event.bucket);
        assert_eq!(back.size, Some(42));
    }
}
