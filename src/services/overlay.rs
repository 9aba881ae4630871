// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user profile overlay cache.
//!
//! Holds the client-only profile fields (avatar selection, bio, phone)
//! that the backend may not persist, namespaced by user identity key.
//! Storage failures here are swallowed: losing an overlay field is
//! recoverable, blocking a profile read is not.

use crate::models::{ProfileOverlay, UserProfile};
use crate::store::{keys, LocalStore};
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Process-wide overlay cache. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct OverlayCache {
    store: LocalStore,
    cache: Arc<DashMap<String, ProfileOverlay>>,
}

impl OverlayCache {
    pub fn new(store: LocalStore) -> Self {
        Self {
            store,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// The stored overlay for `user_key`, empty when none exists or the
    /// stored entry is unreadable.
    pub async fn get(&self, user_key: &str) -> ProfileOverlay {
        if let Some(overlay) = self.cache.get(user_key) {
            return overlay.clone();
        }

        let overlay: ProfileOverlay = self
            .store
            .get(&keys::overlay(user_key))
            .await
            .unwrap_or_default();
        self.cache.insert(user_key.to_string(), overlay.clone());
        overlay
    }

    /// Filter `fields` to the allow-list and merge the result into the
    /// stored overlay. Returns the overlay now in effect.
    ///
    /// An overlay that is empty after filtering deletes the entry
    /// rather than persisting an empty object.
    pub async fn apply(&self, user_key: &str, fields: &Map<String, Value>) -> ProfileOverlay {
        let incoming = ProfileOverlay::from_partial(fields);
        let merged = self.get(user_key).await.merged_with(&incoming);
        self.put(user_key, merged.clone()).await;
        merged
    }

    /// Merge the stored overlay for `user_key` on top of `profile`.
    pub async fn merge_into(&self, user_key: &str, profile: &mut UserProfile) {
        self.get(user_key).await.merge_into(profile);
    }

    /// Drop the overlay for `user_key`, in memory and on disk.
    pub async fn clear(&self, user_key: &str) {
        self.cache.remove(user_key);
        if let Err(e) = self.store.remove(&keys::overlay(user_key)).await {
            tracing::warn!(user_key, error = %e, "Failed to remove overlay entry");
        }
    }

    async fn put(&self, user_key: &str, overlay: ProfileOverlay) {
        if overlay.is_empty() {
            self.clear(user_key).await;
            return;
        }

        self.cache.insert(user_key.to_string(), overlay.clone());
        if let Err(e) = self.store.set(&keys::overlay(user_key), &overlay).await {
            tracing::warn!(user_key, error = %e, "Failed to persist overlay entry");
        }
    }
}
