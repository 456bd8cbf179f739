//! Core types for BuzzCart

use std::collections::BTreeMap;

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Unique identifier for a user account
///
/// Opaque to everything except the auth provider that minted it. Also used
/// as the key of the user's record under `users/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Create a new random UserId (16 random bytes, base58)
    pub fn new() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        Self(bs58::encode(&bytes).into_string())
    }

    /// Get the string form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A user's record as stored at `users/{id}`
///
/// Every field defaults when absent so partially written records still
/// decode. `user_id` is not part of the stored document; it is filled from
/// the record's key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserRecord {
    #[serde(skip)]
    pub user_id: UserId,
    pub full_name: String,
    /// Lowercase mirror of `full_name`, maintained client-side for search
    pub full_name_lower: String,
    pub email: String,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
    pub likes_received: i64,
    pub profile_views: i64,
    pub popularity_score: f64,
    /// Unix timestamp in milliseconds
    pub last_active: i64,
    /// Generated key -> follower id
    pub followers: BTreeMap<String, String>,
    /// Generated key -> followed user id
    pub following: BTreeMap<String, String>,
}

impl UserRecord {
    /// Create a fresh record for a newly registered user
    pub fn new(user_id: UserId, full_name: impl Into<String>, email: impl Into<String>) -> Self {
        let full_name = full_name.into();
        Self {
            user_id,
            full_name_lower: full_name.to_lowercase(),
            full_name,
            email: email.into(),
            last_active: chrono::Utc::now().timestamp_millis(),
            ..Default::default()
        }
    }

    /// Decode a record from its stored JSON value and key
    pub fn from_value(user_id: UserId, value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut record: UserRecord = serde_json::from_value(value)?;
        record.user_id = user_id;
        Ok(record)
    }

    /// Whether `other` appears in this user's following list
    pub fn is_following(&self, other: &UserId) -> bool {
        self.following.values().any(|id| id == other.as_str())
    }
}

/// Format a counter for compact display: `1.2M`, `3.4K`, `999`
pub fn format_count(count: i64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}

/// `"1 result"` / `"N results"`
pub fn pluralize_results(count: usize) -> String {
    if count == 1 {
        "1 result".to_string()
    } else {
        format!("{} results", count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_id_is_random() {
        let a = UserId::new();
        let b = UserId::new();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn test_new_record_mirrors_lowercase_name() {
        let record = UserRecord::new("u1".into(), "Alice Smith", "alice@example.com");
        assert_eq!(record.full_name_lower, "alice smith");
        assert_eq!(record.followers_count, 0);
        assert!(record.last_active > 0);
    }

    #[test]
    fn test_record_decodes_partial_document() {
        let value = json!({
            "fullName": "Bob",
            "email": "bob@example.com",
            "followersCount": 7,
            "following": { "k1": "u9" }
        });
        let record = UserRecord::from_value("u2".into(), value).unwrap();
        assert_eq!(record.user_id.as_str(), "u2");
        assert_eq!(record.followers_count, 7);
        assert_eq!(record.following_count, 0);
        assert!(record.is_following(&"u9".into()));
        assert!(!record.is_following(&"u1".into()));
    }

    #[test]
    fn test_record_serializes_camel_case_without_id() {
        let record = UserRecord::new("u3".into(), "Carl", "carl@example.com");
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("fullNameLower").is_some());
        assert!(value.get("user_id").is_none());
        assert!(value.get("userId").is_none());
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_500), "1.5K");
        assert_eq!(format_count(2_345_678), "2.3M");
    }

    #[test]
    fn test_pluralize_results() {
        assert_eq!(pluralize_results(0), "0 results");
        assert_eq!(pluralize_results(1), "1 result");
        assert_eq!(pluralize_results(12), "12 results");
    }
}
