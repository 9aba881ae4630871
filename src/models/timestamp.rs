// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Heterogeneous timestamp normalization.
//!
//! Backends and cached payloads deliver timestamps as epoch seconds,
//! epoch milliseconds, numeric text, calendar text, or wrapped-seconds
//! objects. All of those funnel through [`RawTimestamp`] at the serde
//! boundary; everything downstream consumes `DateTime<Utc>` only.
//!
//! A value that cannot be normalized is `None` and is excluded from
//! ordering and display. It is never substituted with "now".

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Numeric values at or above this are epoch milliseconds; below it,
/// epoch seconds.
const EPOCH_MILLIS_CUTOFF: f64 = 1e12;

/// A timestamp as it arrives off the wire, shape not yet known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    /// Epoch seconds or milliseconds.
    Number(f64),
    /// Wrapped-seconds object (Firestore-style exports).
    Wrapped { seconds: i64 },
    /// Calendar text or numeric text.
    Text(String),
}

impl RawTimestamp {
    /// Resolve to a canonical instant, or `None` for anything
    /// unrecognizable or out of range.
    pub fn normalize(&self) -> Option<DateTime<Utc>> {
        match self {
            RawTimestamp::Number(n) => from_epoch(*n),
            RawTimestamp::Wrapped { seconds } => Utc.timestamp_opt(*seconds, 0).single(),
            RawTimestamp::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return None;
                }
                if s.chars().all(|c| c.is_ascii_digit()) {
                    return s.parse::<f64>().ok().and_then(from_epoch);
                }
                parse_text(s)
            }
        }
    }
}

impl From<DateTime<Utc>> for RawTimestamp {
    /// Already-normalized instants pass through at millisecond precision.
    fn from(instant: DateTime<Utc>) -> Self {
        RawTimestamp::Number(instant.timestamp_millis() as f64)
    }
}

fn from_epoch(n: f64) -> Option<DateTime<Utc>> {
    if !n.is_finite() {
        return None;
    }
    let millis = if n.abs() >= EPOCH_MILLIS_CUTOFF { n } else { n * 1000.0 };
    Utc.timestamp_millis_opt(millis as i64).single()
}

fn parse_text(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Bare date-times without an offset are taken as UTC
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// Label an instant for the activity feed, relative to `now`.
///
/// Same local calendar day reads "Today", the previous calendar day
/// "Yesterday", anything older as month and day.
pub fn format_event_time(instant: DateTime<Utc>, now: DateTime<Local>) -> String {
    let local = instant.with_timezone(&now.timezone());
    let clock = local.format("%-I:%M %p");

    let day = local.date_naive();
    let today = now.date_naive();
    if day == today {
        format!("Today, {}", clock)
    } else if today.pred_opt() == Some(day) {
        format!("Yesterday, {}", clock)
    } else {
        format!("{}, {}", local.format("%b %-d"), clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, NaiveDate};

    fn parse(raw: serde_json::Value) -> Option<DateTime<Utc>> {
        serde_json::from_value::<RawTimestamp>(raw)
            .ok()
            .and_then(|t| t.normalize())
    }

    #[test]
    fn test_all_wire_shapes_agree() {
        let expected = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();

        assert_eq!(parse(serde_json::json!(1_700_000_000i64)), Some(expected));
        assert_eq!(parse(serde_json::json!(1_700_000_000_000i64)), Some(expected));
        assert_eq!(parse(serde_json::json!("1700000000")), Some(expected));
        assert_eq!(parse(serde_json::json!("2023-11-14T22:13:20Z")), Some(expected));
        assert_eq!(
            parse(serde_json::json!({ "seconds": 1_700_000_000i64 })),
            Some(expected)
        );
    }

    #[test]
    fn test_iso_roundtrip() {
        let instant = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
        let raw = RawTimestamp::Text(instant.to_rfc3339());
        assert_eq!(raw.normalize(), Some(instant));
    }

    #[test]
    fn test_instant_passthrough() {
        let instant = Utc.timestamp_millis_opt(1_700_000_000_123).single().unwrap();
        assert_eq!(RawTimestamp::from(instant).normalize(), Some(instant));
    }

    #[test]
    fn test_unrecognizable_shapes_are_none() {
        assert_eq!(RawTimestamp::Text("".to_string()).normalize(), None);
        assert_eq!(RawTimestamp::Text("   ".to_string()).normalize(), None);
        assert_eq!(RawTimestamp::Text("next tuesday".to_string()).normalize(), None);
        assert_eq!(RawTimestamp::Number(f64::NAN).normalize(), None);
    }

    #[test]
    fn test_offset_text_converts_to_utc() {
        let normalized = RawTimestamp::Text("2024-01-15T10:00:00+02:00".to_string())
            .normalize()
            .unwrap();
        assert_eq!(normalized.to_rfc3339(), "2024-01-15T08:00:00+00:00");
    }

    #[test]
    fn test_format_event_time_buckets() {
        let now_naive = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let now = Local.from_local_datetime(&now_naive).unwrap();

        let same_day = now - chrono::Duration::hours(3);
        let label = format_event_time(same_day.with_timezone(&Utc), now);
        assert!(label.starts_with("Today, "), "got {}", label);

        let yesterday = now - chrono::Duration::days(1);
        let label = format_event_time(yesterday.with_timezone(&Utc), now);
        assert!(label.starts_with("Yesterday, "), "got {}", label);

        let older = now - chrono::Duration::days(10);
        let label = format_event_time(older.with_timezone(&Utc), now);
        assert!(label.starts_with("Jan 5, "), "got {}", label);
    }

    #[test]
    fn test_yesterday_is_calendar_day_not_24_hours() {
        let now_naive = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(0, 30, 0)
            .unwrap();
        let now = Local.from_local_datetime(&now_naive).unwrap();

        // One hour earlier, but already the previous calendar day
        let earlier = now - chrono::Duration::hours(1);
        let label = format_event_time(earlier.with_timezone(&Utc), now);
        assert!(label.starts_with("Yesterday, "), "got {}", label);
    }
}
