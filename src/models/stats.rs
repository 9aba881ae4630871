//! Counter state: the daily quota window, offline fallback counters,
//! and the reconciliation source marker.
//!
//! These are plain state types; the services own when they mutate and
//! when they persist.

use serde::{Deserialize, Serialize};

/// Maximum qualifying shakes per local calendar day.
pub const DAILY_SHAKE_LIMIT: u32 = 5;

/// The current day's shake count, attributed to one local calendar date.
///
/// A window whose `date_key` is not today is stale and must read as
/// zero; rolling it over is the only way its count resets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaWindow {
    pub date_key: String,
    pub count: u32,
}

impl QuotaWindow {
    pub fn fresh(date_key: &str) -> Self {
        Self {
            date_key: date_key.to_string(),
            count: 0,
        }
    }

    pub fn is_stale(&self, today_key: &str) -> bool {
        self.date_key != today_key
    }

    /// Reset a stale window to `today_key` with count zero. Idempotent:
    /// returns whether anything changed, so callers know to persist.
    pub fn roll_over(&mut self, today_key: &str) -> bool {
        if !self.is_stale(today_key) {
            return false;
        }
        self.date_key = today_key.to_string();
        self.count = 0;
        true
    }

    pub fn limit_reached(&self, limit: u32) -> bool {
        self.count >= limit
    }
}

/// Locally persisted counters, authoritative only while the backend is
/// unreachable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackCounters {
    pub daily_count: u32,
    pub daily_date_key: String,
    pub total_count: u64,
}

impl FallbackCounters {
    /// Count one shake, rolling the daily bucket first if its date key
    /// is stale.
    pub fn record(&mut self, today_key: &str) {
        if self.daily_date_key != today_key {
            self.daily_count = 0;
            self.daily_date_key = today_key.to_string();
        }
        self.daily_count += 1;
        self.total_count += 1;
    }

    /// Today's count, reading a stale daily bucket as zero.
    pub fn daily_for(&self, today_key: &str) -> u32 {
        if self.daily_date_key == today_key {
            self.daily_count
        } else {
            0
        }
    }
}

/// Which source currently backs the displayed counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    /// No fetch attempted yet this session.
    #[default]
    Unknown,
    /// Backend unreachable; fallback counters are shown.
    LocalOnly,
    /// Backend counts fetched; they replace the fallback values.
    Synced,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roll_over_resets_stale_window() {
        let mut window = QuotaWindow {
            date_key: "2024-01-01".to_string(),
            count: 5,
        };

        assert!(window.roll_over("2024-01-02"));
        assert_eq!(window.count, 0);
        assert_eq!(window.date_key, "2024-01-02");
    }

    #[test]
    fn test_roll_over_is_idempotent() {
        let mut window = QuotaWindow {
            date_key: "2024-01-01".to_string(),
            count: 5,
        };

        assert!(window.roll_over("2024-01-02"));
        window.count = 2;
        // Same day again: nothing changes
        assert!(!window.roll_over("2024-01-02"));
        assert_eq!(window.count, 2);
    }

    #[test]
    fn test_limit_reached() {
        let window = QuotaWindow {
            date_key: "2024-01-01".to_string(),
            count: DAILY_SHAKE_LIMIT,
        };
        assert!(window.limit_reached(DAILY_SHAKE_LIMIT));
        assert!(!QuotaWindow::fresh("2024-01-01").limit_reached(DAILY_SHAKE_LIMIT));
    }

    #[test]
    fn test_fallback_record_rolls_stale_daily_bucket() {
        let mut counters = FallbackCounters {
            daily_count: 4,
            daily_date_key: "2024-01-01".to_string(),
            total_count: 15,
        };

        counters.record("2024-01-02");

        assert_eq!(counters.daily_count, 1);
        assert_eq!(counters.daily_date_key, "2024-01-02");
        assert_eq!(counters.total_count, 16);
    }

    #[test]
    fn test_fallback_daily_for_stale_key_is_zero() {
        let counters = FallbackCounters {
            daily_count: 4,
            daily_date_key: "2024-01-01".to_string(),
            total_count: 15,
        };

        assert_eq!(counters.daily_for("2024-01-01"), 4);
        assert_eq!(counters.daily_for("2024-01-02"), 0);
    }
}
