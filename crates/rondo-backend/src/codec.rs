//! Raw row ↔ attribute-set conversion.
//!
//! The `data` column stores the user payload plus an injected `type` tag
//! in one JSON object; the tag is split back out on decode. Payload and
//! kind are separate fields everywhere else in the domain model.

use chrono::{DateTime, Utc};
use serde_json::Value;

use rondo_types::{Payload, ScheduleAttributes};

/// Column list shared by every read in the backend.
pub(crate) const SELECT_COLUMNS: &str = "id, timeout, next_time, cron, delay, data, timezone";

/// One raw schedule row, exactly as persisted.
#[derive(Debug, Clone)]
pub(crate) struct ScheduleRow {
    pub id: String,
    pub timeout: i64,
    pub next_time: i64,
    pub cron: Option<String>,
    pub delay: Option<i64>,
    pub data: Option<String>,
    pub timezone: Option<String>,
}

impl ScheduleRow {
    /// Map a [`SELECT_COLUMNS`] result row.
    pub(crate) fn from_sql(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timeout: row.get(1)?,
            next_time: row.get(2)?,
            cron: row.get(3)?,
            delay: row.get(4)?,
            data: row.get(5)?,
            timezone: row.get(6)?,
        })
    }
}

/// Decode a raw row into the logical attribute set.
///
/// Lenient by contract: a missing timezone defaults to "UTC", a missing
/// delay to 0, and a malformed payload degrades to an empty object rather
/// than failing the read.
pub(crate) fn decode_attributes(row: &ScheduleRow) -> ScheduleAttributes {
    let mut data: Payload = row
        .data
        .as_deref()
        .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
        .and_then(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default();

    let kind = match data.remove("type") {
        Some(Value::String(s)) => s,
        _ => String::new(),
    };

    ScheduleAttributes {
        timezone: row.timezone.clone().unwrap_or_else(|| "UTC".to_string()),
        delay: row.delay.unwrap_or(0),
        cron: row.cron.clone(),
        data,
        next_time: epoch_to_utc(row.next_time),
        next_run_time: epoch_to_utc(row.timeout),
        kind,
        message: None,
        node: None,
    }
}

/// Serialize a payload with the `type` tag injected.
pub(crate) fn encode_payload(kind: &str, data: &Payload) -> String {
    let mut data = data.clone();
    data.insert("type".to_string(), Value::String(kind.to_string()));
    Value::Object(data).to_string()
}

/// Epoch seconds to a UTC timestamp, clamping out-of-range values.
pub(crate) fn epoch_to_utc(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(data: Option<&str>) -> ScheduleRow {
        ScheduleRow {
            id: "job1".into(),
            timeout: 1_700_000_060,
            next_time: 1_700_000_000,
            cron: Some("0 * * * *".into()),
            delay: Some(30),
            data: data.map(str::to_string),
            timezone: Some("Asia/Tokyo".into()),
        }
    }

    #[test]
    fn test_decode_extracts_type_tag() {
        let attrs = decode_attributes(&row(Some(r#"{"type":"report","target":"daily"}"#)));
        assert_eq!(attrs.kind, "report");
        assert_eq!(attrs.data.get("target"), Some(&Value::String("daily".into())));
        assert!(!attrs.data.contains_key("type"));
        assert_eq!(attrs.timezone, "Asia/Tokyo");
        assert_eq!(attrs.delay, 30);
        assert_eq!(attrs.next_time.timestamp(), 1_700_000_000);
        assert_eq!(attrs.next_run_time.timestamp(), 1_700_000_060);
        assert!(attrs.message.is_none());
        assert!(attrs.node.is_none());
    }

    #[test]
    fn test_decode_defaults() {
        let mut r = row(None);
        r.timezone = None;
        r.delay = None;
        r.cron = None;
        let attrs = decode_attributes(&r);
        assert_eq!(attrs.timezone, "UTC");
        assert_eq!(attrs.delay, 0);
        assert!(attrs.cron.is_none());
        assert_eq!(attrs.kind, "");
        assert!(attrs.data.is_empty());
    }

    #[test]
    fn test_decode_malformed_payload_degrades() {
        for bad in [Some("{not json"), Some("[1,2,3]"), Some("null")] {
            let attrs = decode_attributes(&row(bad));
            assert!(attrs.data.is_empty());
            assert_eq!(attrs.kind, "");
        }
    }

    #[test]
    fn test_encode_then_decode_round_trip() {
        let mut payload = Payload::new();
        payload.insert("target".into(), Value::String("daily".into()));
        let mut r = row(None);
        r.data = Some(encode_payload("report", &payload));
        let attrs = decode_attributes(&r);
        assert_eq!(attrs.kind, "report");
        assert_eq!(attrs.data, payload);
    }
}
