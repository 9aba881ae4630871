// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bearer credential lifecycle.
//!
//! One token at a time, persisted across restarts, with an in-memory
//! read-through cache so request construction stays cheap. No local
//! expiry tracking: an expired token is discovered by the backend's
//! authorization failure and surfaced, never retried here.

use crate::error::AppError;
use crate::store::{keys, LocalStore};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-wide credential store. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CredentialStore {
    store: LocalStore,
    cached: Arc<RwLock<Option<String>>>,
}

impl CredentialStore {
    pub fn new(store: LocalStore) -> Self {
        Self {
            store,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// Current token, reading through to persisted storage when the
    /// cache is cold. `None` means requests go out unauthenticated.
    pub async fn token(&self) -> Option<String> {
        if let Some(token) = self.cached.read().await.clone() {
            return Some(token);
        }

        let token: Option<String> = self.store.get(keys::TOKEN).await;
        if let Some(token) = &token {
            *self.cached.write().await = Some(token.clone());
        }
        token
    }

    /// Set or clear the token. Clearing removes the persisted entry,
    /// not just the in-memory cache.
    pub async fn set_token(&self, token: Option<&str>) -> Result<(), AppError> {
        *self.cached.write().await = token.map(str::to_string);

        match token {
            Some(token) => self.store.set(keys::TOKEN, &token).await,
            None => self.store.remove(keys::TOKEN).await,
        }
    }
}
