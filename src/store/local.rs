// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! File-backed key/value store for persisted client state.
//!
//! One JSON document on disk holds every persisted key (token, quota
//! window, fallback counters, per-user overlays). Writes go through a
//! temp file and rename, so a crash mid-write leaves the previous
//! document intact rather than a torn one.

use crate::error::AppError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

const STORE_FILE: &str = "state.json";

/// Persistent key/value store.
#[derive(Clone)]
pub struct LocalStore {
    path: PathBuf,
    entries: Arc<Mutex<HashMap<String, serde_json::Value>>>,
}

impl LocalStore {
    /// Open (or create) the store under `dir`.
    ///
    /// An unreadable or corrupt document starts the store empty instead
    /// of failing: cached client state is always recoverable.
    pub async fn open(dir: &Path) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create {}: {}", dir.display(), e)))?;

        let path = dir.join(STORE_FILE);
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Discarding corrupt state file");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Ok(Self {
            path,
            entries: Arc::new(Mutex::new(entries)),
        })
    }

    /// Read and deserialize a value.
    ///
    /// A missing entry or one that no longer matches the expected shape
    /// reads as `None`; callers treat that as "no cached value".
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entries = self.entries.lock().await;
        let value = entries.get(key)?.clone();
        drop(entries);

        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!(key, error = %e, "Ignoring unreadable stored value");
                None
            }
        }
    }

    /// Serialize and persist a value under `key`.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let value = serde_json::to_value(value)
            .map_err(|e| AppError::Storage(format!("Failed to encode {}: {}", key, e)))?;

        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value);
        self.flush(&entries).await
    }

    /// Remove a key. Clears persisted storage, not just memory.
    pub async fn remove(&self, key: &str) -> Result<(), AppError> {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.flush(&entries).await
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.lock().await.contains_key(key)
    }

    /// Write the whole document atomically (temp file + rename).
    async fn flush(&self, entries: &HashMap<String, serde_json::Value>) -> Result<(), AppError> {
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| AppError::Storage(format!("Failed to encode state: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw.as_bytes())
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write state: {}", e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to replace state: {}", e)))
    }
}
