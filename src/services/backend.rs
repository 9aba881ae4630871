// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Backend API client.
//!
//! Handles:
//! - Request construction with lazily attached bearer credentials
//! - One-shot error classification from status codes and body text
//! - Endpoint-absent (404) detection for optional routes
//!
//! Classification happens here and nowhere else; callers branch on
//! `AppError` variants only.

use crate::error::AppError;
use crate::models::{ActivityRecord, ShakeRecord, UserProfile, DAILY_SHAKE_LIMIT};
use crate::services::CredentialStore;
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Backend quota rejections carry this marker in their message text.
const QUOTA_MESSAGE_MARKER: &str = "limit";

/// Failure mode for mock clients used in tests.
#[derive(Debug, Clone, Copy)]
enum MockFailure {
    /// Connectivity failure: exercises the offline fallback paths.
    Offline,
    /// Endpoint absent: exercises the degrade/absorb paths.
    Unsupported,
}

impl MockFailure {
    fn to_error(self) -> AppError {
        match self {
            MockFailure::Offline => {
                AppError::Network("backend unreachable (offline mode)".to_string())
            }
            MockFailure::Unsupported => {
                AppError::NotSupported("endpoint absent (mock)".to_string())
            }
        }
    }
}

/// HTTP client for the shake backend.
#[derive(Clone)]
pub struct BackendClient {
    http: Option<reqwest::Client>,
    mock_failure: MockFailure,
    base_url: String,
    credentials: CredentialStore,
}

impl BackendClient {
    pub fn new(base_url: &str, credentials: CredentialStore) -> Self {
        Self {
            http: Some(reqwest::Client::new()),
            mock_failure: MockFailure::Offline,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Create a mock client for testing (offline mode).
    ///
    /// Every request fails with a network error.
    pub fn new_mock(credentials: CredentialStore) -> Self {
        Self {
            http: None,
            mock_failure: MockFailure::Offline,
            base_url: String::new(),
            credentials,
        }
    }

    /// Mock client whose requests all fail as an unsupported endpoint.
    pub fn new_unsupported_mock(credentials: CredentialStore) -> Self {
        Self {
            http: None,
            mock_failure: MockFailure::Unsupported,
            base_url: String::new(),
            credentials,
        }
    }

    // ─── Auth ────────────────────────────────────────────────────────

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let body = serde_json::json!({ "email": email, "password": password });
        self.post_json("/api/auth/login", &body).await
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, AppError> {
        let body = serde_json::json!({ "name": name, "email": email, "password": password });
        self.post_json("/api/auth/register", &body).await
    }

    /// Authoritative profile for the current credentials.
    pub async fn me(&self) -> Result<UserProfile, AppError> {
        self.get_json("/api/auth/me", &[]).await
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), AppError> {
        let body = serde_json::json!({ "email": email });
        let _: Value = self.post_json("/api/auth/forgot-password", &body).await?;
        Ok(())
    }

    // ─── Profile ─────────────────────────────────────────────────────

    /// PATCH a partial profile update. May be unsupported (404) on
    /// deployments without the endpoint; callers absorb that case.
    pub async fn update_profile(
        &self,
        partial: &Map<String, Value>,
    ) -> Result<UserProfile, AppError> {
        let client = self.client().await?;
        let request = client
            .patch(self.url("/api/users/me"))
            .json(&Value::Object(partial.clone()));
        let request = self.authorize(request).await;

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;
        Self::check_json(response).await
    }

    pub async fn delete_account(&self) -> Result<(), AppError> {
        let client = self.client().await?;
        let request = self.authorize(client.delete(self.url("/api/users/me"))).await;

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    // ─── Shakes ──────────────────────────────────────────────────────

    /// Submit one shake event.
    pub async fn record_shake(
        &self,
        count: u32,
        timestamp: DateTime<Utc>,
    ) -> Result<ShakeRecord, AppError> {
        let body = serde_json::json!({
            "count": count,
            "timestamp": format_utc_rfc3339(timestamp),
        });
        self.post_json("/api/shakes", &body).await
    }

    /// Authoritative count for one local calendar date.
    pub async fn daily_count(&self, date_key: &str) -> Result<u32, AppError> {
        let listing: ShakeListing = self
            .get_json("/api/shakes", &[("date", date_key.to_string())])
            .await?;
        Ok(listing.count())
    }

    /// Authoritative lifetime count.
    pub async fn total_count(&self) -> Result<u64, AppError> {
        let listing: ShakeListing = self.get_json("/api/shakes", &[]).await?;
        Ok(listing.count() as u64)
    }

    pub async fn shakes_on(&self, date_key: &str) -> Result<Vec<ShakeRecord>, AppError> {
        let listing: ShakeListing = self
            .get_json("/api/shakes", &[("date", date_key.to_string())])
            .await?;
        Ok(listing.into_records())
    }

    // ─── Activities ──────────────────────────────────────────────────

    /// Activity records of one kind, newest first per the backend.
    /// Callers handle the endpoint-absent case.
    pub async fn activities(&self, kind: &str, limit: u32) -> Result<Vec<ActivityRecord>, AppError> {
        let value: Value = self
            .get_json(
                "/api/activities",
                &[("type", kind.to_string()), ("limit", limit.to_string())],
            )
            .await?;

        // Some deployments return non-array payloads here; treat them
        // as an empty feed rather than a hard failure
        let records = match value {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        };
        Ok(records)
    }

    pub async fn log_activity(
        &self,
        kind: &str,
        description: &str,
        metadata: &Value,
    ) -> Result<(), AppError> {
        let body = serde_json::json!({
            "type": kind,
            "description": description,
            "metadata": metadata,
        });
        let _: Value = self.post_json("/api/activities", &body).await?;
        Ok(())
    }

    // ─── Feedback ────────────────────────────────────────────────────

    pub async fn submit_feedback(
        &self,
        title: &str,
        message: &str,
        category: &str,
        rating: u8,
    ) -> Result<(), AppError> {
        let body = serde_json::json!({
            "title": title,
            "message": message,
            "category": category,
            "rating": rating,
        });
        let _: Value = self.post_json("/api/feedbacks", &body).await?;
        Ok(())
    }

    // ─── Internals ───────────────────────────────────────────────────

    async fn client(&self) -> Result<&reqwest::Client, AppError> {
        match &self.http {
            Some(client) => Ok(client),
            None => {
                // Mock requests still cross an await point, so callers
                // see the same suspension behavior as live requests
                tokio::task::yield_now().await;
                Err(self.mock_failure.to_error())
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach bearer credentials when a token is present; absent
    /// credentials send the request unauthenticated.
    async fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.credentials.token().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let client = self.client().await?;
        let request = self.authorize(client.get(self.url(path)).query(query)).await;

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;
        Self::check_json(response).await
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, AppError> {
        let client = self.client().await?;
        let request = self.authorize(client.post(self.url(path)).json(body)).await;

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;
        Self::check_json(response).await
    }

    /// Check response status, classifying failures into the taxonomy.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
        if response.status().is_success() {
            return Ok(response);
        }
        Err(Self::classify(response).await)
    }

    /// Check response and parse the JSON body.
    async fn check_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AppError> {
        let response = Self::check(response).await?;
        response
            .json()
            .await
            .map_err(|e| AppError::Backend(format!("JSON parse error: {}", e)))
    }

    async fn classify(response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message =
            error_message(&body).unwrap_or_else(|| format!("Request failed ({})", status));

        match status.as_u16() {
            401 => AppError::InvalidToken,
            404 => AppError::NotSupported(message),
            429 => AppError::QuotaExceeded {
                count: None,
                limit: DAILY_SHAKE_LIMIT,
            },
            _ if is_quota_message(&message) => AppError::QuotaExceeded {
                count: None,
                limit: DAILY_SHAKE_LIMIT,
            },
            _ => AppError::Backend(format!("HTTP {}: {}", status, message)),
        }
    }
}

/// Error body shape used by the backend: `message` or `error`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .filter(|m| !m.is_empty())
}

fn is_quota_message(message: &str) -> bool {
    message.to_ascii_lowercase().contains(QUOTA_MESSAGE_MARKER)
}

/// Login/register response; backends differ on where the token lives.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default, alias = "accessToken")]
    access_token: Option<String>,
    #[serde(default)]
    data: Option<AuthData>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AuthData {
    #[serde(default)]
    token: Option<String>,
    #[serde(default, alias = "accessToken")]
    access_token: Option<String>,
}

impl AuthResponse {
    /// First token found across the known envelope shapes.
    pub fn token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .or(self.access_token.as_deref())
            .or_else(|| self.data.as_ref().and_then(|d| d.token.as_deref()))
            .or_else(|| self.data.as_ref().and_then(|d| d.access_token.as_deref()))
    }
}

/// Shakes listing; some deployments return a bare array, others a
/// counted envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ShakeListing {
    Records(Vec<ShakeRecord>),
    Counted {
        count: u32,
        #[serde(default)]
        shakes: Vec<ShakeRecord>,
    },
}

impl ShakeListing {
    fn count(&self) -> u32 {
        match self {
            ShakeListing::Records(records) => records.len() as u32,
            ShakeListing::Counted { count, .. } => *count,
        }
    }

    fn into_records(self) -> Vec<ShakeRecord> {
        match self {
            ShakeListing::Records(records) => records,
            ShakeListing::Counted { shakes, .. } => shakes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(json: Value) -> AuthResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_token_extraction_from_envelope_shapes() {
        assert_eq!(auth(serde_json::json!({ "token": "t1" })).token(), Some("t1"));
        assert_eq!(
            auth(serde_json::json!({ "accessToken": "t2" })).token(),
            Some("t2")
        );
        assert_eq!(
            auth(serde_json::json!({ "data": { "token": "t3" } })).token(),
            Some("t3")
        );
        assert_eq!(
            auth(serde_json::json!({ "data": { "accessToken": "t4" } })).token(),
            Some("t4")
        );
        assert_eq!(auth(serde_json::json!({ "user": {} })).token(), None);
    }

    #[test]
    fn test_token_priority_prefers_top_level() {
        let res = auth(serde_json::json!({
            "token": "top",
            "data": { "token": "nested" }
        }));
        assert_eq!(res.token(), Some("top"));
    }

    #[test]
    fn test_shake_listing_from_bare_array() {
        let listing: ShakeListing = serde_json::from_value(serde_json::json!([
            { "_id": "a", "count": 1 },
            { "_id": "b", "count": 1 },
        ]))
        .unwrap();
        assert_eq!(listing.count(), 2);
        assert_eq!(listing.into_records().len(), 2);
    }

    #[test]
    fn test_shake_listing_from_counted_envelope() {
        let listing: ShakeListing =
            serde_json::from_value(serde_json::json!({ "count": 7 })).unwrap();
        assert_eq!(listing.count(), 7);
        assert!(listing.into_records().is_empty());
    }

    #[test]
    fn test_error_message_parsing() {
        assert_eq!(
            error_message(r#"{"message":"Daily limit reached"}"#).as_deref(),
            Some("Daily limit reached")
        );
        assert_eq!(
            error_message(r#"{"error":"bad things"}"#).as_deref(),
            Some("bad things")
        );
        assert_eq!(error_message("not json"), None);
        assert_eq!(error_message(r#"{"message":""}"#), None);
    }

    #[test]
    fn test_quota_message_marker() {
        assert!(is_quota_message("Daily limit reached"));
        assert!(is_quota_message("shake LIMIT exceeded"));
        assert!(!is_quota_message("internal server error"));
    }
}
