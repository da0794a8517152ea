//! Backend collaborator
//!
//! The narrow interface the session manager consumes from the data/auth
//! service:
//! - a record store for users, queried by equality filters, whose inserts
//!   report uniqueness violations distinctly
//! - an identity session that can be restored, ended, and observed for
//!   changes
//!
//! `SqlxBackend` implements it on top of the database layer.

mod database;

pub use database::SqlxBackend;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::models::{Identity, NewUserRecord, UserRecord};

/// Error code the backend attaches to uniqueness violations (SQLSTATE 23505)
pub const UNIQUE_VIOLATION_CODE: &str = "23505";

/// Errors reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// An insert collided with a uniqueness constraint
    #[error("{message}")]
    UniqueViolation { code: String, message: String },

    /// The record store could not answer the request
    #[error("{0}")]
    Query(String),

    /// The identity session could not be read or changed
    #[error("{0}")]
    Auth(String),
}

impl BackendError {
    pub fn unique_violation(message: impl Into<String>) -> Self {
        Self::UniqueViolation {
            code: UNIQUE_VIOLATION_CODE.to_string(),
            message: message.into(),
        }
    }

    /// Backend error code, when the backend supplies one
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::UniqueViolation { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.code() == Some(UNIQUE_VIOLATION_CODE)
    }
}

/// Equality filter over the `users` record store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFilter {
    Id(i64),
    SecurityCode(i64),
}

/// Identity change as published by the backend: the new identity, or `None`
/// once no identity is active.
pub type IdentityChange = Option<Identity>;

/// Live registration for identity change notifications.
///
/// Dropping the subscription or calling `unsubscribe` releases it.
#[derive(Debug)]
pub struct IdentitySubscription {
    receiver: Option<broadcast::Receiver<IdentityChange>>,
}

impl IdentitySubscription {
    pub fn new(receiver: broadcast::Receiver<IdentityChange>) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }

    /// Wait for the next identity change.
    ///
    /// Returns `None` once the subscription is released or the backend
    /// stops publishing.
    pub async fn recv(&mut self) -> Option<IdentityChange> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Identity subscription lagged, skipped {} change(s)", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    pub fn unsubscribe(&mut self) {
        self.receiver = None;
    }
}

/// Data/auth service consumed by the session manager
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Identity restorable from a previous run, if any
    async fn current_identity(&self) -> Result<Option<Identity>, BackendError>;

    /// Register for identity change notifications
    fn subscribe(&self) -> IdentitySubscription;

    /// Look up at most one user record matching the filter
    async fn find_user(&self, filter: UserFilter) -> Result<Option<UserRecord>, BackendError>;

    /// Insert a user record
    async fn insert_user(&self, user: NewUserRecord) -> Result<UserRecord, BackendError>;

    /// Terminate the backend's identity session
    async fn end_identity_session(&self) -> Result<(), BackendError>;
}

/// Type alias for a shared backend
pub type DynAuthBackend = Arc<dyn AuthBackend>;
