// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types shared by every service in the client core.

/// Application error type.
///
/// Classification happens once, in the backend client; everything
/// downstream branches on these variants instead of inspecting status
/// codes or message text.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Daily shake limit reached")]
    QuotaExceeded {
        /// Authoritative count for today, when the backend reported one.
        count: Option<u32>,
        limit: u32,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Endpoint not supported: {0}")]
    NotSupported(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Missing, invalid, or expired credentials. Never retried.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, AppError::InvalidToken)
    }

    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, AppError::QuotaExceeded { .. })
    }

    /// Endpoint absent on this backend deployment.
    pub fn is_not_supported(&self) -> bool {
        matches!(self, AppError::NotSupported(_))
    }

    /// Connectivity failure. Recoverable; triggers the local fallback
    /// path in the shake recorder.
    pub fn is_network(&self) -> bool {
        matches!(self, AppError::Network(_))
    }
}

/// Result type alias for the client core.
pub type Result<T> = std::result::Result<T, AppError>;
