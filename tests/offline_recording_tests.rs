// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end offline behavior of the shake recorder: local fallback
//! counting, fail-fast quota enforcement, and the re-entrancy guard.

use shake_tracker::models::{QuotaWindow, SyncState, DAILY_SHAKE_LIMIT};
use shake_tracker::services::{
    BackendClient, CredentialStore, QuotaTracker, ShakeOutcome, ShakeRecorder, SyncService,
};
use shake_tracker::store::{keys, LocalStore};
use shake_tracker::time_utils::local_date_key;

async fn offline_recorder(store: LocalStore) -> ShakeRecorder {
    let credentials = CredentialStore::new(store.clone());
    let backend = BackendClient::new_mock(credentials);
    let quota = QuotaTracker::load(store.clone(), chrono::Local::now()).await;
    let sync = SyncService::load(store).await;
    ShakeRecorder::new(backend, quota, sync)
}

#[tokio::test]
async fn test_offline_shake_reads_as_success_and_counts_locally() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::open(dir.path()).await.unwrap();
    let recorder = offline_recorder(store.clone()).await;

    let outcome = recorder.record_shake().await.expect("offline shake should succeed");
    let record = match outcome {
        ShakeOutcome::Recorded(record) => record,
        ShakeOutcome::InFlight => panic!("no submission was in flight"),
    };
    assert!(record.is_local());

    // Displayed counts come from the fallback counters
    assert_eq!(recorder.refresh_counts().await, (1, 1));
    assert_eq!(recorder.sync_state().await, SyncState::LocalOnly);

    // The optimistic quota increment was persisted
    let window: QuotaWindow = store.get(keys::QUOTA_WINDOW).await.unwrap();
    assert_eq!(window.count, 1);
}

#[tokio::test]
async fn test_local_limit_fails_fast_without_network() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::open(dir.path()).await.unwrap();

    // Seed today's window at the limit
    let today = local_date_key(chrono::Local::now());
    store
        .set(
            keys::QUOTA_WINDOW,
            &QuotaWindow {
                date_key: today,
                count: DAILY_SHAKE_LIMIT,
            },
        )
        .await
        .unwrap();

    let recorder = offline_recorder(store).await;
    let err = recorder.record_shake().await.unwrap_err();
    assert!(err.is_quota_exceeded());

    // Nothing was counted on top of the seeded window
    assert_eq!(recorder.refresh_counts().await, (0, 0));
}

#[tokio::test]
async fn test_rapid_double_trigger_records_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::open(dir.path()).await.unwrap();
    let recorder = offline_recorder(store).await;

    // Both calls start in the same tick; the second finds the guard held
    let (first, second) = tokio::join!(recorder.record_shake(), recorder.record_shake());
    let outcomes = [first.unwrap(), second.unwrap()];

    let recorded = outcomes
        .iter()
        .filter(|o| matches!(o, ShakeOutcome::Recorded(_)))
        .count();
    let skipped = outcomes
        .iter()
        .filter(|o| matches!(o, ShakeOutcome::InFlight))
        .count();
    assert_eq!(recorded, 1);
    assert_eq!(skipped, 1);
    assert_eq!(recorder.refresh_counts().await, (1, 1));
}

#[tokio::test]
async fn test_guard_releases_after_each_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::open(dir.path()).await.unwrap();
    let recorder = offline_recorder(store).await;

    for expected_total in 1..=3u64 {
        match recorder.record_shake().await.unwrap() {
            ShakeOutcome::Recorded(_) => {}
            ShakeOutcome::InFlight => panic!("guard was not released"),
        }
        let (_, total) = recorder.refresh_counts().await;
        assert_eq!(total, expected_total);
    }
}

#[tokio::test]
async fn test_offline_shakes_stop_at_the_daily_limit() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::open(dir.path()).await.unwrap();
    let recorder = offline_recorder(store).await;

    for _ in 0..DAILY_SHAKE_LIMIT {
        recorder.record_shake().await.expect("under the limit");
    }

    let err = recorder.record_shake().await.unwrap_err();
    assert!(err.is_quota_exceeded());
    let (daily, _) = recorder.refresh_counts().await;
    assert_eq!(daily, DAILY_SHAKE_LIMIT);
}
