//! Backend identity model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated principal as known to the backend's own auth mechanism.
///
/// Distinct from a `UserRecord`: an identity may exist without a linked
/// record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Identity ID (UUID)
    pub id: String,
    /// Linked user record, if any
    pub user_id: Option<i64>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Identity {
    /// Create a fresh identity, optionally linked to a user record
    pub fn new(user_id: Option<i64>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            created_at: Utc::now(),
        }
    }
}
