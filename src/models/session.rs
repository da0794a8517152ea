//! Session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{Identity, UserRecord};

/// The principal a session asserts.
///
/// Login produces a `Record`; restoring or observing a backend identity
/// produces an `Identity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionUser {
    Record(UserRecord),
    Identity(Identity),
}

impl SessionUser {
    /// ID of the user record behind this principal, if known
    pub fn user_record_id(&self) -> Option<i64> {
        match self {
            SessionUser::Record(record) => Some(record.id),
            SessionUser::Identity(identity) => identity.user_id,
        }
    }
}

impl From<UserRecord> for SessionUser {
    fn from(record: UserRecord) -> Self {
        SessionUser::Record(record)
    }
}

impl From<Identity> for SessionUser {
    fn from(identity: Identity) -> Self {
        SessionUser::Identity(identity)
    }
}

/// Process-local assertion that a principal is authenticated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Authenticated principal
    pub user: SessionUser,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Start a session that lasts `ttl` from now
    pub fn start(user: impl Into<SessionUser>, ttl: Duration) -> Self {
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            user: user.into(),
            expires_at,
        }
    }

    /// Check if the session has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
