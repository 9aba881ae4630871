// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shake and activity feed records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::timestamp::RawTimestamp;
use crate::models::user::RecordId;

/// A recorded shake event. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShakeRecord {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// Submitted amount; backends echo it, local records carry 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<RawTimestamp>,
    /// Reward payload attached by the backend, opaque to the client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<Value>,
}

impl ShakeRecord {
    /// A locally simulated record, produced when the backend is
    /// unreachable and the shake is counted by the fallback path.
    pub fn local(now: DateTime<Utc>) -> Self {
        Self {
            id: Some(RecordId::Text(format!("local-{}", now.timestamp_millis()))),
            count: Some(1),
            timestamp: Some(RawTimestamp::from(now)),
            reward: None,
        }
    }

    /// True when this record never reached the backend.
    pub fn is_local(&self) -> bool {
        matches!(&self.id, Some(RecordId::Text(id)) if id.starts_with("local-"))
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_ref().and_then(RawTimestamp::normalize)
    }
}

/// Raw entry in the backend's activity feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<RawTimestamp>,
}

impl ActivityRecord {
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_ref().and_then(RawTimestamp::normalize)
    }

    /// Stable display id: server id, else the raw timestamp, else a
    /// positional fallback.
    pub fn display_id(&self, index: usize) -> String {
        if let Some(id) = &self.id {
            return id.to_string();
        }
        if let Some(instant) = self.instant() {
            return instant.timestamp_millis().to_string();
        }
        format!("idx-{}", index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_record_is_marked() {
        let record = ShakeRecord::local(Utc::now());
        assert!(record.is_local());
        assert_eq!(record.count, Some(1));
        assert!(record.instant().is_some());
    }

    #[test]
    fn test_server_record_is_not_local() {
        let record: ShakeRecord =
            serde_json::from_value(serde_json::json!({ "_id": "abc", "count": 1 })).unwrap();
        assert!(!record.is_local());
    }

    #[test]
    fn test_activity_display_id_fallbacks() {
        let with_id: ActivityRecord =
            serde_json::from_value(serde_json::json!({ "_id": 7, "type": "shake" })).unwrap();
        assert_eq!(with_id.display_id(0), "7");

        let with_timestamp: ActivityRecord = serde_json::from_value(
            serde_json::json!({ "type": "shake", "timestamp": 1_700_000_000i64 }),
        )
        .unwrap();
        assert_eq!(with_timestamp.display_id(0), "1700000000000");

        let bare: ActivityRecord = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(bare.display_id(3), "idx-3");
    }
}
