// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile reads and updates with overlay semantics.
//!
//! Reads merge the per-user overlay on top of the server profile.
//! Updates try the backend first; a deployment without the profile
//! endpoint absorbs the update into the overlay durably, and any other
//! failure still keeps the client-only subset locally before the error
//! is surfaced.

use crate::error::AppError;
use crate::models::{UserProfile, ANONYMOUS_USER_KEY};
use crate::services::{BackendClient, OverlayCache};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct ProfileService {
    backend: BackendClient,
    overlay: OverlayCache,
    /// Identity key from the last successful profile read, used for
    /// overlay writes when the backend cannot be asked.
    last_identity: Arc<RwLock<Option<String>>>,
}

impl ProfileService {
    pub fn new(backend: BackendClient, overlay: OverlayCache) -> Self {
        Self {
            backend,
            overlay,
            last_identity: Arc::new(RwLock::new(None)),
        }
    }

    /// Authoritative profile with the client overlay merged on top.
    pub async fn current_profile(&self) -> Result<UserProfile, AppError> {
        let mut profile = self.backend.me().await?;
        let key = profile.identity_key();
        self.remember_identity(&key).await;
        self.overlay.merge_into(&key, &mut profile).await;
        Ok(profile)
    }

    /// Apply a partial profile update.
    ///
    /// The client-only subset of `partial` is always persisted to the
    /// overlay, so subsequent reads reflect the user's intent whether or
    /// not the backend accepted the update.
    pub async fn update_profile(
        &self,
        partial: &Map<String, Value>,
    ) -> Result<UserProfile, AppError> {
        match self.backend.update_profile(partial).await {
            Ok(mut updated) => {
                let key = self.identity_for(&updated).await;
                let overlay = self.overlay.apply(&key, partial).await;
                overlay.merge_into(&mut updated);
                Ok(updated)
            }
            Err(e) if e.is_not_supported() => {
                // No profile endpoint on this deployment: the overlay
                // absorbs the update and the caller sees success
                tracing::info!("Profile update endpoint absent, absorbing into overlay");
                match self.backend.me().await {
                    Ok(mut current) => {
                        let key = self.identity_for(&current).await;
                        let overlay = self.overlay.apply(&key, partial).await;
                        overlay.merge_into(&mut current);
                        Ok(current)
                    }
                    Err(read_err) => {
                        tracing::debug!(error = %read_err, "Profile read failed while absorbing update");
                        let key = self.identity_key().await;
                        let overlay = self.overlay.apply(&key, partial).await;
                        let mut profile = UserProfile::default();
                        overlay.merge_into(&mut profile);
                        Ok(profile)
                    }
                }
            }
            Err(e) => {
                // Best-effort local persistence, then surface the error
                let key = self.identity_key().await;
                self.overlay.apply(&key, partial).await;
                Err(e)
            }
        }
    }

    /// Identity key for overlay writes: the last successful read's key,
    /// else the anonymous sentinel.
    pub async fn identity_key(&self) -> String {
        self.last_identity
            .read()
            .await
            .clone()
            .unwrap_or_else(|| ANONYMOUS_USER_KEY.to_string())
    }

    /// Drop the remembered identity (logout, account deletion).
    pub async fn forget_identity(&self) {
        *self.last_identity.write().await = None;
    }

    async fn identity_for(&self, profile: &UserProfile) -> String {
        let key = profile.identity_key();
        if key != ANONYMOUS_USER_KEY {
            self.remember_identity(&key).await;
            return key;
        }
        self.identity_key().await
    }

    async fn remember_identity(&self, key: &str) {
        *self.last_identity.write().await = Some(key.to_string());
    }
}
