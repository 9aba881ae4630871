//! Local persistence layer (file-backed key/value state).

pub mod local;

pub use local::LocalStore;

/// Storage keys as constants.
///
/// Versioned so a future format change can migrate by key instead of
/// guessing at stale payload shapes.
pub mod keys {
    pub const TOKEN: &str = "api_token_v1";
    pub const QUOTA_WINDOW: &str = "quota_window_v1";
    pub const FALLBACK_COUNTERS: &str = "fallback_counters_v1";

    /// Per-user overlay entries, namespaced by identity key so switching
    /// accounts on one device cannot leak a previous user's overlay.
    pub fn overlay(user_key: &str) -> String {
        format!("user_overlay_v1:{}", user_key)
    }
}
