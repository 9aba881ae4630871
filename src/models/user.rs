//! User profile, client-only overlay, and identity models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::timestamp::RawTimestamp;

/// The fixed allow-list of client-only overlay fields.
pub const OVERLAY_FIELDS: [&str; 3] = ["avatarIndex", "bio", "phone"];

/// Identity key used when no profile field can anchor one.
pub const ANONYMOUS_USER_KEY: &str = "anonymous";

/// An entity identifier; backends disagree on strings versus numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Text(String),
    Number(i64),
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordId::Text(s) => f.write_str(s),
            RecordId::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Server-authoritative user profile.
///
/// The backend is loose about field names, so aliases absorb the
/// variants seen in the wild. Fields this client does not model ride
/// along in `extra`; an overlay merge must never drop or alter them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, alias = "_id")]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    /// Client-selected avatar slot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Lifetime qualifying shakes, server-authoritative
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_shakes: Option<u64>,
    /// Today's qualifying shakes, server-authoritative
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_shakes: Option<u32>,
    #[serde(
        default,
        alias = "created_at",
        alias = "created",
        alias = "createdOn",
        alias = "created_on",
        alias = "registeredAt",
        alias = "registered_at",
        alias = "joinedAt",
        alias = "joined_at",
        alias = "joinDate",
        alias = "signupDate",
        alias = "signUpDate",
        alias = "creationTime",
        alias = "createdDate",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<RawTimestamp>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Stable key namespacing per-user local state: id, else email,
    /// else the anonymous sentinel.
    pub fn identity_key(&self) -> String {
        if let Some(id) = &self.id {
            return id.to_string();
        }
        if let Some(email) = self.email.as_deref().filter(|e| !e.is_empty()) {
            return email.to_string();
        }
        ANONYMOUS_USER_KEY.to_string()
    }

    /// Name shown in greetings: name, else username, else the local
    /// part of the email address, else "User".
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        if let Some(username) = self.username.as_deref().filter(|n| !n.is_empty()) {
            return username.to_string();
        }
        if let Some(email) = self.email.as_deref() {
            if let Some(local_part) = email.split('@').next().filter(|p| !p.is_empty()) {
                return local_part.to_string();
            }
        }
        "User".to_string()
    }

    /// Best-effort account creation instant.
    ///
    /// Falls back to scanning the passthrough fields for created-ish
    /// keys under any of the timestamp encodings, since older backends
    /// bury this under nested response envelopes.
    pub fn created_instant(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        if let Some(instant) = self.created_at.as_ref().and_then(RawTimestamp::normalize) {
            return Some(instant);
        }
        scan_created_at(&self.extra, 0)
    }
}

const CREATED_AT_SCAN_DEPTH: usize = 3;

fn created_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.contains("creat") || key.contains("regist") || key.contains("join") || key.contains("signup")
}

fn scan_created_at(map: &Map<String, Value>, depth: usize) -> Option<chrono::DateTime<chrono::Utc>> {
    if depth > CREATED_AT_SCAN_DEPTH {
        return None;
    }
    for (key, value) in map {
        if created_key(key) {
            if let Ok(raw) = serde_json::from_value::<RawTimestamp>(value.clone()) {
                if let Some(instant) = raw.normalize() {
                    return Some(instant);
                }
            }
        }
        if let Value::Object(nested) = value {
            if let Some(instant) = scan_created_at(nested, depth + 1) {
                return Some(instant);
            }
        }
    }
    None
}

/// Client-only profile fields merged over the server profile.
///
/// Only the allow-listed fields exist here, so an overlay is incapable
/// of shadowing a server-authoritative field by construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileOverlay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ProfileOverlay {
    /// Filter an arbitrary update payload down to the allow-list.
    /// Everything else in `fields` is discarded.
    pub fn from_partial(fields: &Map<String, Value>) -> Self {
        let [avatar_key, bio_key, phone_key] = OVERLAY_FIELDS;
        Self {
            avatar_index: fields.get(avatar_key).and_then(as_index),
            bio: fields
                .get(bio_key)
                .and_then(Value::as_str)
                .map(str::to_string),
            phone: fields
                .get(phone_key)
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.avatar_index.is_none() && self.bio.is_none() && self.phone.is_none()
    }

    /// Combine with a newer overlay; fields present in `newer` win.
    pub fn merged_with(&self, newer: &ProfileOverlay) -> Self {
        Self {
            avatar_index: newer.avatar_index.or(self.avatar_index),
            bio: newer.bio.clone().or_else(|| self.bio.clone()),
            phone: newer.phone.clone().or_else(|| self.phone.clone()),
        }
    }

    /// Overwrite the allow-listed fields of `profile` with any values
    /// present here. No other field of `profile` is touched.
    pub fn merge_into(&self, profile: &mut UserProfile) {
        if let Some(avatar_index) = self.avatar_index {
            profile.avatar_index = Some(avatar_index);
        }
        if let Some(bio) = &self.bio {
            profile.bio = Some(bio.clone());
        }
        if let Some(phone) = &self.phone {
            profile.phone = Some(phone.clone());
        }
    }
}

/// Avatar indexes arrive as numbers or numeric strings.
fn as_index(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().map(|v| v as u32),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
