// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity feed reads and best-effort activity logging.
//!
//! The activities endpoint is optional on the backend: a missing route
//! degrades reads to an empty feed and writes to a soft skip, never a
//! user-facing failure.

use crate::error::AppError;
use crate::models::timestamp::format_event_time;
use crate::models::{ActivityRecord, ShakeRecord};
use crate::services::BackendClient;
use chrono::{DateTime, Local, Utc};

/// Feed entry ready for display, timestamp already normalized.
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    /// "Today, 10:30 AM" style label
    pub label: String,
}

/// Outcome of a best-effort activity log write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutcome {
    Logged,
    /// The backend has no activities endpoint; nothing was written.
    Skipped,
}

#[derive(Clone)]
pub struct ActivityFeed {
    backend: BackendClient,
}

impl ActivityFeed {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }

    /// Recent shake activities, newest first.
    ///
    /// Entries whose timestamps cannot be normalized are excluded from
    /// the feed rather than pinned to "now".
    pub async fn recent_shakes(&self, limit: u32) -> Result<Vec<FeedEntry>, AppError> {
        let records = match self.backend.activities("shake", limit).await {
            Ok(records) => records,
            Err(e) if e.is_not_supported() => {
                tracing::debug!("Activities endpoint absent, serving empty feed");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        Ok(feed_entries(&records, Local::now()))
    }

    /// Shake records for one local calendar date, for the history view.
    pub async fn shakes_on(&self, date_key: &str) -> Result<Vec<ShakeRecord>, AppError> {
        self.backend.shakes_on(date_key).await
    }

    /// Log an activity; a backend without the endpoint is a soft skip.
    pub async fn log(&self, kind: &str, description: &str) -> Result<LogOutcome, AppError> {
        match self
            .backend
            .log_activity(kind, description, &serde_json::json!({}))
            .await
        {
            Ok(()) => Ok(LogOutcome::Logged),
            Err(e) if e.is_not_supported() => {
                tracing::debug!(kind, "Activities endpoint absent, skipping log");
                Ok(LogOutcome::Skipped)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn submit_feedback(
        &self,
        title: &str,
        message: &str,
        category: &str,
        rating: u8,
    ) -> Result<(), AppError> {
        self.backend
            .submit_feedback(title, message, category, rating)
            .await
    }
}

/// Normalize, label, and order raw activity records for display.
fn feed_entries(records: &[ActivityRecord], now: DateTime<Local>) -> Vec<FeedEntry> {
    let mut entries: Vec<FeedEntry> = records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let timestamp = record.instant()?;
            Some(FeedEntry {
                id: record.display_id(index),
                kind: record.kind.clone().unwrap_or_else(|| "shake".to_string()),
                title: record
                    .title
                    .clone()
                    .or_else(|| record.description.clone())
                    .unwrap_or_else(|| "Shake".to_string()),
                timestamp,
                label: format_event_time(timestamp, now),
            })
        })
        .collect();

    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(json: serde_json::Value) -> Vec<ActivityRecord> {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_entries_ordered_newest_first() {
        let records = records(serde_json::json!([
            { "_id": "old", "type": "shake", "timestamp": 1_700_000_000i64 },
            { "_id": "new", "type": "shake", "timestamp": 1_700_090_000i64 },
        ]));

        let entries = feed_entries(&records, Local::now());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "new");
        assert_eq!(entries[1].id, "old");
    }

    #[test]
    fn test_unnormalizable_timestamps_are_excluded() {
        let records = records(serde_json::json!([
            { "_id": "good", "type": "shake", "timestamp": 1_700_000_000i64 },
            { "_id": "bad", "type": "shake", "timestamp": "sometime" },
            { "_id": "none", "type": "shake" },
        ]));

        let entries = feed_entries(&records, Local::now());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "good");
    }

    #[test]
    fn test_mixed_timestamp_encodings_order_consistently() {
        let records = records(serde_json::json!([
            { "_id": "seconds", "timestamp": 1_700_000_000i64 },
            { "_id": "millis", "timestamp": 1_700_050_000_000i64 },
            { "_id": "iso", "timestamp": "2023-11-14T22:30:00Z" },
        ]));

        let entries = feed_entries(&records, Local::now());
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["millis", "iso", "seconds"]);
    }
}
