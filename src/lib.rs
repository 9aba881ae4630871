// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shake-Tracker: offline-first client core for daily shake rewards.
//!
//! This crate keeps a rate-limited shake counter correct while the
//! backend is unreachable: credential lifecycle, per-user profile
//! overlays, a daily quota window with midnight reset, idempotent shake
//! recording with a local fallback, and count reconciliation once
//! connectivity returns. Views and navigation are external collaborators
//! that call through [`ShakeClient`].

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod time_utils;

use config::Config;
use error::Result;
use services::{
    AccountService, ActivityFeed, BackendClient, CredentialStore, OverlayCache, ProfileService,
    QuotaTracker, ShakeRecorder, SyncService,
};
use store::LocalStore;

/// Shared client state wiring every service together.
///
/// The credential store and overlay cache are process-wide: every clone
/// of a service shares their state, and nothing reaches into another
/// component's persisted keys directly.
pub struct ShakeClient {
    pub config: Config,
    pub credentials: CredentialStore,
    pub account: AccountService,
    pub profile: ProfileService,
    pub quota: QuotaTracker,
    pub sync: SyncService,
    pub recorder: ShakeRecorder,
    pub feed: ActivityFeed,
}

impl ShakeClient {
    /// Wire up all services against the given config.
    pub async fn new(config: Config) -> Result<Self> {
        let store = LocalStore::open(&config.data_dir).await?;
        let credentials = CredentialStore::new(store.clone());
        let backend = BackendClient::new(&config.backend_url, credentials.clone());

        let overlay = OverlayCache::new(store.clone());
        let profile = ProfileService::new(backend.clone(), overlay.clone());
        let account = AccountService::new(
            backend.clone(),
            credentials.clone(),
            overlay,
            profile.clone(),
        );

        let quota = QuotaTracker::load(store.clone(), chrono::Local::now()).await;
        let sync = SyncService::load(store).await;
        let recorder = ShakeRecorder::new(backend.clone(), quota.clone(), sync.clone());
        let feed = ActivityFeed::new(backend);

        Ok(Self {
            config,
            credentials,
            account,
            profile,
            quota,
            sync,
            recorder,
            feed,
        })
    }
}
