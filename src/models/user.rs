//! User record model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Application-level profile row, keyed by its security code.
///
/// Records are created by registration and never mutated or deleted by
/// this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Unique identifier
    pub id: i64,
    /// Display name (not unique)
    pub username: String,
    /// 4-digit numeric credential (unique)
    #[serde(skip_serializing)]
    pub security_code: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Values for a record that has not been inserted yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserRecord {
    pub username: String,
    pub security_code: i64,
}

impl NewUserRecord {
    pub fn new(username: impl Into<String>, security_code: i64) -> Self {
        Self {
            username: username.into(),
            security_code,
        }
    }
}
