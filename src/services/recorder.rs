// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shake submission with quota enforcement and offline fallback.
//!
//! One logical submission at a time: a capacity-1 semaphore rejects
//! overlapping triggers (double taps, overlapping sensor pulses), and
//! its permit is released on every exit path. Quota is checked locally,
//! then against the backend when reachable, and the backend enforces it
//! once more at submission time.

use crate::error::AppError;
use crate::models::{ShakeRecord, SyncState};
use crate::services::{BackendClient, QuotaTracker, SyncService};
use crate::time_utils::local_date_key;
use chrono::{DateTime, Local, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Outcome of a `record_shake` call.
#[derive(Debug)]
pub enum ShakeOutcome {
    /// The shake was recorded, server-side or via the offline fallback.
    Recorded(ShakeRecord),
    /// Another submission was in flight; this call did nothing.
    InFlight,
}

/// In-memory flags the motion detector polls per sample. Cheap to
/// clone; clones share state.
#[derive(Clone)]
pub struct RecorderStatus {
    pub(crate) in_flight: Arc<Semaphore>,
    pub(crate) limit_reached: Arc<AtomicBool>,
}

impl RecorderStatus {
    fn new() -> Self {
        Self {
            in_flight: Arc::new(Semaphore::new(1)),
            limit_reached: Arc::new(AtomicBool::new(false)),
        }
    }

    /// No submission currently in flight.
    pub fn idle(&self) -> bool {
        self.in_flight.available_permits() > 0
    }

    /// Today's limit was reached, as of the last quota check.
    pub fn limit_reached(&self) -> bool {
        self.limit_reached.load(Ordering::Relaxed)
    }
}

/// Records qualifying shakes against the backend, falling back to the
/// local counters when it is unreachable.
#[derive(Clone)]
pub struct ShakeRecorder {
    backend: BackendClient,
    quota: QuotaTracker,
    sync: SyncService,
    status: RecorderStatus,
}

impl ShakeRecorder {
    pub fn new(backend: BackendClient, quota: QuotaTracker, sync: SyncService) -> Self {
        Self {
            backend,
            quota,
            sync,
            status: RecorderStatus::new(),
        }
    }

    /// Handle to the in-memory flags for the motion detector.
    pub fn status(&self) -> RecorderStatus {
        self.status.clone()
    }

    pub fn limit(&self) -> u32 {
        self.quota.limit()
    }

    /// Record one qualifying shake.
    ///
    /// Re-entrant calls while a submission is in flight are a no-op.
    /// A connectivity failure records locally and reads as success; the
    /// counts reconcile on the next successful backend read.
    pub async fn record_shake(&self) -> Result<ShakeOutcome, AppError> {
        let _permit = match self.status.in_flight.try_acquire() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::debug!("Submission already in flight, ignoring trigger");
                return Ok(ShakeOutcome::InFlight);
            }
        };

        // The permit is held until this function returns, so every exit
        // path below releases the guard
        let result = self.record_guarded().await;
        self.refresh_limit_flag().await;
        result
    }

    async fn record_guarded(&self) -> Result<ShakeOutcome, AppError> {
        let now_local = Local::now();
        let now_utc = Utc::now();
        let today = local_date_key(now_local);
        let limit = self.quota.limit();

        // Fail fast on the local window before any network traffic
        let window = self.quota.ensure_fresh(now_local).await;
        if window.limit_reached(limit) {
            return Err(AppError::QuotaExceeded {
                count: Some(window.count),
                limit,
            });
        }

        // Server-synced pre-check: two sessions racing a purely local
        // count could exceed the limit together
        match self.backend.daily_count(&today).await {
            Ok(count) => {
                let window = self.quota.set_count(count, now_local).await;
                if window.limit_reached(limit) {
                    return Err(AppError::QuotaExceeded {
                        count: Some(window.count),
                        limit,
                    });
                }
            }
            Err(e) => {
                // The backend enforces the limit again at submission
                tracing::debug!(error = %e, "Pre-check unavailable, proceeding");
            }
        }

        match self.backend.record_shake(1, now_utc).await {
            Ok(record) => {
                self.after_submission(now_local).await;
                tracing::info!("Shake recorded");
                Ok(ShakeOutcome::Recorded(record))
            }
            Err(AppError::QuotaExceeded { .. }) => {
                // The backend says the day is full; trust its count
                let count = self.backend.daily_count(&today).await.unwrap_or(limit);
                let window = self.quota.set_count(count, now_local).await;
                Err(AppError::QuotaExceeded {
                    count: Some(window.count),
                    limit,
                })
            }
            Err(e) if e.is_network() => {
                let counters = self.sync.record_local(now_local).await;
                self.quota.record(1, now_local).await;
                tracing::info!(
                    daily = counters.daily_count,
                    total = counters.total_count,
                    "Backend unreachable, shake recorded locally"
                );
                Ok(ShakeOutcome::Recorded(ShakeRecord::local(now_utc)))
            }
            // Anything else mutates no counters and surfaces verbatim
            Err(e) => Err(e),
        }
    }

    /// After a successful submission, prefer re-fetching authoritative
    /// counts over blind local incrementing, to stay correct across
    /// devices.
    async fn after_submission(&self, now: DateTime<Local>) {
        let today = local_date_key(now);
        match tokio::try_join!(self.backend.daily_count(&today), self.backend.total_count()) {
            Ok((daily, total)) => {
                self.sync.mark_synced(daily, total, now).await;
                self.quota.set_count(daily, now).await;
            }
            Err(e) => {
                tracing::debug!(error = %e, "Count re-fetch failed after submission");
                self.quota.record(1, now).await;
            }
        }
    }

    /// Fetch authoritative counts and reconcile, falling back to the
    /// local counters when the backend cannot answer. Returns the
    /// displayed (daily, total) pair.
    pub async fn refresh_counts(&self) -> (u32, u64) {
        let now = Local::now();
        let today = local_date_key(now);
        self.quota.ensure_fresh(now).await;

        let counts = match tokio::try_join!(
            self.backend.daily_count(&today),
            self.backend.total_count()
        ) {
            Ok((daily, total)) => {
                self.sync.mark_synced(daily, total, now).await;
                self.quota.set_count(daily, now).await;
                (daily, total)
            }
            Err(e) => {
                if !e.is_network() {
                    tracing::warn!(error = %e, "Authoritative count read failed");
                }
                self.sync.mark_unreachable().await;
                self.sync.counts(now).await
            }
        };

        self.refresh_limit_flag().await;
        counts
    }

    pub async fn sync_state(&self) -> SyncState {
        self.sync.state().await
    }

    async fn refresh_limit_flag(&self) {
        let window = self.quota.ensure_fresh(Local::now()).await;
        self.status
            .limit_reached
            .store(window.limit_reached(self.quota.limit()), Ordering::Relaxed);
    }
}
