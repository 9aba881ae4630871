// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Count reconciliation between the backend and local fallback
//! counters.
//!
//! Resolution is total-order by source, not by value: authoritative
//! backend counts always win, and fallback counts are discarded the
//! moment a real count is obtained. Summing the two would double count
//! events whose submission eventually succeeded server-side.

use crate::models::{FallbackCounters, SyncState};
use crate::store::{keys, LocalStore};
use crate::time_utils::local_date_key;
use chrono::{DateTime, Local};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct SyncInner {
    fallback: FallbackCounters,
    state: SyncState,
    /// Last counts reported by the backend (daily, total).
    remote: Option<(u32, u64)>,
}

/// Reconciles displayed counts across connectivity transitions.
#[derive(Clone)]
pub struct SyncService {
    store: LocalStore,
    inner: Arc<Mutex<SyncInner>>,
}

impl SyncService {
    /// Load persisted fallback counters; the sync state always starts
    /// a session as `Unknown`.
    pub async fn load(store: LocalStore) -> Self {
        let fallback: FallbackCounters = store
            .get(keys::FALLBACK_COUNTERS)
            .await
            .unwrap_or_default();

        Self {
            store,
            inner: Arc::new(Mutex::new(SyncInner {
                fallback,
                state: SyncState::Unknown,
                remote: None,
            })),
        }
    }

    pub async fn state(&self) -> SyncState {
        self.inner.lock().await.state
    }

    /// Count one shake locally while the backend is unreachable.
    pub async fn record_local(&self, now: DateTime<Local>) -> FallbackCounters {
        let today = local_date_key(now);
        let mut inner = self.inner.lock().await;
        inner.state = SyncState::LocalOnly;
        inner.fallback.record(&today);
        self.persist(&inner.fallback).await;
        inner.fallback.clone()
    }

    /// Replace local counts with authoritative backend counts.
    ///
    /// The fallback counters are overwritten, never summed in.
    pub async fn mark_synced(&self, daily: u32, total: u64, now: DateTime<Local>) {
        let today = local_date_key(now);
        let mut inner = self.inner.lock().await;

        if inner.state != SyncState::Synced {
            tracing::info!(
                daily,
                total,
                discarded_daily = inner.fallback.daily_for(&today),
                "Reconciled counters from backend"
            );
        }

        inner.state = SyncState::Synced;
        inner.remote = Some((daily, total));
        inner.fallback = FallbackCounters {
            daily_count: daily,
            daily_date_key: today,
            total_count: total,
        };
        self.persist(&inner.fallback).await;
    }

    /// Note a failed authoritative read; fallback counters take over.
    pub async fn mark_unreachable(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state != SyncState::LocalOnly {
            tracing::debug!("Backend unreachable, serving local counters");
        }
        inner.state = SyncState::LocalOnly;
    }

    /// Displayed counts (daily, total), chosen by source: backend
    /// values while synced, fallback counters otherwise.
    pub async fn counts(&self, now: DateTime<Local>) -> (u32, u64) {
        let today = local_date_key(now);
        let inner = self.inner.lock().await;
        match (inner.state, inner.remote) {
            (SyncState::Synced, Some((daily, total))) => (daily, total),
            _ => (inner.fallback.daily_for(&today), inner.fallback.total_count),
        }
    }

    async fn persist(&self, fallback: &FallbackCounters) {
        if let Err(e) = self.store.set(keys::FALLBACK_COUNTERS, fallback).await {
            tracing::warn!(error = %e, "Failed to persist fallback counters");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn local(y: i32, m: u32, d: u32) -> DateTime<Local> {
        let naive = NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        Local.from_local_datetime(&naive).unwrap()
    }

    async fn fresh_service() -> (tempfile::TempDir, LocalStore, SyncService) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();
        let service = SyncService::load(store.clone()).await;
        (dir, store, service)
    }

    #[tokio::test]
    async fn test_backend_counts_win_over_fallback() {
        let (_dir, _store, service) = fresh_service().await;
        let now = local(2024, 1, 10);

        service.record_local(now).await;
        service.record_local(now).await;
        assert_eq!(service.counts(now).await, (2, 2));

        // Backend reports different counts: they replace, not add
        service.mark_synced(3, 20, now).await;
        assert_eq!(service.counts(now).await, (3, 20));
        assert_eq!(service.state().await, SyncState::Synced);
    }

    #[tokio::test]
    async fn test_state_walks_unknown_local_synced_local() {
        let (_dir, _store, service) = fresh_service().await;
        let now = local(2024, 1, 10);

        assert_eq!(service.state().await, SyncState::Unknown);

        service.mark_unreachable().await;
        assert_eq!(service.state().await, SyncState::LocalOnly);

        service.mark_synced(1, 5, now).await;
        assert_eq!(service.state().await, SyncState::Synced);

        service.mark_unreachable().await;
        assert_eq!(service.state().await, SyncState::LocalOnly);
    }

    #[tokio::test]
    async fn test_fallback_resumes_from_synced_baseline() {
        let (_dir, _store, service) = fresh_service().await;
        let now = local(2024, 1, 10);

        service.mark_synced(3, 20, now).await;

        // Connectivity drops, one more local shake
        service.record_local(now).await;
        assert_eq!(service.counts(now).await, (4, 21));
    }

    #[tokio::test]
    async fn test_fallback_counters_survive_restart() {
        let (_dir, store, service) = fresh_service().await;
        let now = local(2024, 1, 10);

        service.record_local(now).await;
        service.record_local(now).await;

        let reloaded = SyncService::load(store).await;
        assert_eq!(reloaded.state().await, SyncState::Unknown);
        assert_eq!(reloaded.counts(now).await, (2, 2));
    }

    #[tokio::test]
    async fn test_stale_daily_fallback_reads_zero() {
        let (_dir, _store, service) = fresh_service().await;

        service.record_local(local(2024, 1, 10)).await;

        let next_day = local(2024, 1, 11);
        assert_eq!(service.counts(next_day).await, (0, 1));
    }
}
