// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for local-day bookkeeping and date/time formatting.
//!
//! The quota window resets at device-local midnight; every date key in
//! persisted state is derived here so the format stays consistent.

use chrono::{DateTime, Duration, Local, LocalResult, NaiveTime, SecondsFormat, TimeZone, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Calendar-date key ("YYYY-MM-DD") for the device-local day of `now`.
pub fn local_date_key(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// The next device-local midnight strictly after `now`.
pub fn next_local_midnight(now: DateTime<Local>) -> DateTime<Local> {
    let tomorrow = (now.date_naive() + Duration::days(1)).and_time(NaiveTime::MIN);
    match now.timezone().from_local_datetime(&tomorrow) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        // A DST transition can skip midnight itself
        LocalResult::None => now + Duration::days(1),
    }
}

/// Hours and minutes until the next local midnight. Pure; drives the
/// "time until reset" display only, never a state mutation.
pub fn time_until_reset(now: DateTime<Local>) -> (i64, i64) {
    let remaining = next_local_midnight(now) - now;
    (remaining.num_hours(), remaining.num_minutes() % 60)
}
