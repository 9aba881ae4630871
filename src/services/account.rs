// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account lifecycle: login, registration, logout, deletion.
//!
//! Tokens are set on successful login or registration and cleared on
//! logout and account deletion, together with the current user's
//! overlay so the next session cannot see a previous user's fields.

use crate::error::AppError;
use crate::models::UserProfile;
use crate::services::{BackendClient, CredentialStore, OverlayCache, ProfileService};

/// Result of a login or registration attempt.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
}

#[derive(Clone)]
pub struct AccountService {
    backend: BackendClient,
    credentials: CredentialStore,
    overlay: OverlayCache,
    profile: ProfileService,
}

impl AccountService {
    pub fn new(
        backend: BackendClient,
        credentials: CredentialStore,
        overlay: OverlayCache,
        profile: ProfileService,
    ) -> Self {
        Self {
            backend,
            credentials,
            overlay,
            profile,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let response = self.backend.login(email, password).await?;

        let token = response.token().map(str::to_string);
        if let Some(token) = &token {
            self.store_token(token).await;
        }

        tracing::info!(has_token = token.is_some(), "Login succeeded");
        Ok(AuthSession {
            token,
            user: response.user,
        })
    }

    /// Register a new account.
    ///
    /// Some deployments return no token on registration; a follow-up
    /// login with the same credentials fetches one. A failure of that
    /// follow-up is not surfaced, the registration itself succeeded.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AppError> {
        let response = self.backend.register(name, email, password).await?;

        if let Some(token) = response.token().map(str::to_string) {
            self.store_token(&token).await;
            return Ok(AuthSession {
                token: Some(token),
                user: response.user,
            });
        }

        match self.login(email, password).await {
            Ok(session) => Ok(AuthSession {
                token: session.token,
                user: session.user.or(response.user),
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Post-registration login failed");
                Ok(AuthSession {
                    token: None,
                    user: response.user,
                })
            }
        }
    }

    /// Clear the token and the current user's overlay.
    pub async fn logout(&self) -> Result<(), AppError> {
        self.clear_session().await
    }

    /// Delete the account server-side, then clear all local session
    /// state.
    pub async fn delete_account(&self) -> Result<(), AppError> {
        self.backend.delete_account().await?;
        self.clear_session().await
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), AppError> {
        self.backend.request_password_reset(email).await
    }

    async fn clear_session(&self) -> Result<(), AppError> {
        let user_key = self.profile.identity_key().await;
        self.overlay.clear(&user_key).await;
        self.profile.forget_identity().await;
        // Token removal must clear persisted storage; failures surface
        self.credentials.set_token(None).await
    }

    async fn store_token(&self, token: &str) {
        if let Err(e) = self.credentials.set_token(Some(token)).await {
            // A token that only lives in memory still works this session
            tracing::warn!(error = %e, "Failed to persist token");
        }
    }
}
