// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the client core.

pub mod shake;
pub mod stats;
pub mod timestamp;
pub mod user;

pub use shake::{ActivityRecord, ShakeRecord};
pub use stats::{FallbackCounters, QuotaWindow, SyncState, DAILY_SHAKE_LIMIT};
pub use timestamp::RawTimestamp;
pub use user::{ProfileOverlay, RecordId, UserProfile, ANONYMOUS_USER_KEY};
