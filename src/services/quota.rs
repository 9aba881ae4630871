// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily quota window tracking and the midnight reset protocol.
//!
//! The window lives in two states: fresh (`date_key` is today) and
//! stale. Every read path rolls a stale window over before using it;
//! the roll-over is idempotent and persists immediately. The periodic
//! countdown display never mutates state, it only recomputes
//! [`time_until_reset`].

use crate::models::{QuotaWindow, DAILY_SHAKE_LIMIT};
use crate::store::{keys, LocalStore};
use crate::time_utils::{self, local_date_key};
use chrono::{DateTime, Local};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Tracks today's shake count against the fixed daily limit.
#[derive(Clone)]
pub struct QuotaTracker {
    store: LocalStore,
    window: Arc<Mutex<QuotaWindow>>,
    limit: u32,
}

impl QuotaTracker {
    /// Load the persisted window; a missing or unreadable entry starts
    /// fresh for today.
    pub async fn load(store: LocalStore, now: DateTime<Local>) -> Self {
        let today = local_date_key(now);
        let window: QuotaWindow = store
            .get(keys::QUOTA_WINDOW)
            .await
            .unwrap_or_else(|| QuotaWindow::fresh(&today));

        Self {
            store,
            window: Arc::new(Mutex::new(window)),
            limit: DAILY_SHAKE_LIMIT,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Roll the window over if its date key is stale. Idempotent; a
    /// second call on the same day changes nothing. Returns the window
    /// now in effect.
    pub async fn ensure_fresh(&self, now: DateTime<Local>) -> QuotaWindow {
        let today = local_date_key(now);
        let mut window = self.window.lock().await;
        if window.roll_over(&today) {
            tracing::info!(date_key = %today, "Quota window rolled over");
            self.persist(&window).await;
        }
        window.clone()
    }

    /// Current window without a staleness check. Prefer
    /// [`ensure_fresh`](Self::ensure_fresh) on read paths.
    pub async fn window(&self) -> QuotaWindow {
        self.window.lock().await.clone()
    }

    pub async fn limit_reached(&self, now: DateTime<Local>) -> bool {
        self.ensure_fresh(now).await.limit_reached(self.limit)
    }

    /// Optimistic local increment after a submission.
    pub async fn record(&self, count: u32, now: DateTime<Local>) -> QuotaWindow {
        let today = local_date_key(now);
        let mut window = self.window.lock().await;
        window.roll_over(&today);
        window.count += count;
        self.persist(&window).await;
        window.clone()
    }

    /// Corrective set from an authoritative backend count.
    pub async fn set_count(&self, count: u32, now: DateTime<Local>) -> QuotaWindow {
        let today = local_date_key(now);
        let mut window = self.window.lock().await;
        window.roll_over(&today);
        if window.count != count {
            window.count = count;
            self.persist(&window).await;
        }
        window.clone()
    }

    /// Hours and minutes until the next local midnight. Pure; display
    /// only.
    pub fn time_until_reset(now: DateTime<Local>) -> (i64, i64) {
        time_utils::time_until_reset(now)
    }

    async fn persist(&self, window: &QuotaWindow) {
        if let Err(e) = self.store.set(keys::QUOTA_WINDOW, window).await {
            tracing::warn!(error = %e, "Failed to persist quota window");
        }
    }
}
