//! Session manager
//!
//! Single source of truth for "is there a currently authenticated identity".
//! Owns the user/session/loading state and implements:
//! - Initialization: restore a backend identity and follow its changes
//! - Login by security code
//! - Logout (fails closed: local state survives a failed sign-out)
//! - Registration of new user records
//! - Session expiry
//!
//! State snapshots are published on a `watch` channel; user-visible
//! notifications go out on a `broadcast` channel.

use crate::backend::{BackendError, DynAuthBackend, IdentityChange, IdentitySubscription, UserFilter};
use crate::models::{NewUserRecord, Notification, Session, SessionUser, UserRecord};
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// Default session lifetime in seconds
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 3600;

const NOTIFICATION_CHANNEL_CAPACITY: usize = 32;

/// Snapshot of the session state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub user: Option<SessionUser>,
    pub session: Option<Session>,
    /// True until the session state has been resolved for the first time.
    /// "No session" must not be read as "unauthenticated" while set.
    pub loading: bool,
}

impl SessionState {
    fn unresolved() -> Self {
        Self {
            user: None,
            session: None,
            loading: true,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

/// Error types for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No user record holds the security code
    #[error("Invalid security code.")]
    InvalidSecurityCode,

    /// Registration collided with an existing security code
    #[error("{0}")]
    SecurityCodeTaken(String),

    /// The security code is not an integer
    #[error("Security code must be a 4-digit number.")]
    MalformedSecurityCode,

    /// `initialize` was already called
    #[error("Session manager already initialized")]
    AlreadyInitialized,

    /// The backend failed
    #[error("{0}")]
    Backend(#[from] BackendError),
}

/// Session manager shared by all request handlers
pub struct SessionManager {
    backend: DynAuthBackend,
    ttl: Duration,
    state: Arc<watch::Sender<SessionState>>,
    notifications: broadcast::Sender<Notification>,
    listener: Mutex<Option<JoinHandle<()>>>,
    initialized: AtomicBool,
}

impl SessionManager {
    /// Create a manager with the default session lifetime
    pub fn new(backend: DynAuthBackend) -> Self {
        Self::with_ttl(backend, Duration::seconds(DEFAULT_SESSION_TTL_SECONDS))
    }

    /// Create a manager whose sessions last `ttl`
    pub fn with_ttl(backend: DynAuthBackend, ttl: Duration) -> Self {
        let (state, _) = watch::channel(SessionState::unresolved());
        let (notifications, _) = broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY);
        Self {
            backend,
            ttl,
            state: Arc::new(state),
            notifications,
            listener: Mutex::new(None),
            initialized: AtomicBool::new(false),
        }
    }

    /// Resolve the initial session state and start following backend
    /// identity changes.
    ///
    /// Restoration failures are logged and leave the manager
    /// unauthenticated; only a second call returns an error.
    pub async fn initialize(&self) -> Result<(), SessionError> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(SessionError::AlreadyInitialized);
        }

        // Subscribe before the check so no change in between is lost
        let subscription = self.backend.subscribe();
        self.spawn_listener(subscription);

        match self.backend.current_identity().await {
            Ok(Some(identity)) => {
                tracing::info!("Restored identity session: {}", identity.id);
                apply_identity_change(&self.state, Some(identity), self.ttl);
            }
            Ok(None) => {
                tracing::debug!("No identity session to restore");
                self.state.send_modify(|state| state.loading = false);
            }
            Err(e) => {
                tracing::error!("Failed to restore identity session: {}", e);
                self.state.send_modify(|state| state.loading = false);
            }
        }

        Ok(())
    }

    fn spawn_listener(&self, mut subscription: IdentitySubscription) {
        let state = self.state.clone();
        let ttl = self.ttl;
        let handle = tokio::spawn(async move {
            while let Some(change) = subscription.recv().await {
                tracing::debug!(
                    "Identity change: {}",
                    if change.is_some() { "signed in" } else { "signed out" }
                );
                apply_identity_change(&state, change, ttl);
            }
            tracing::debug!("Identity subscription closed");
        });

        if let Ok(mut listener) = self.listener.lock() {
            if let Some(previous) = listener.replace(handle) {
                previous.abort();
            }
        }
    }

    /// Log in with a 4-digit security code.
    ///
    /// The caller validates the format. An unknown code emits one
    /// notification and leaves the state untouched.
    pub async fn login(&self, code: &str) -> Result<Session, SessionError> {
        let Some(security_code) = parse_security_code(code) else {
            return Err(self.reject_login());
        };

        let record = self
            .backend
            .find_user(UserFilter::SecurityCode(security_code))
            .await?;

        let Some(record) = record else {
            return Err(self.reject_login());
        };

        let session = Session::start(record.clone(), self.ttl);
        tracing::info!("User {} logged in", record.id);
        self.state.send_modify(|state| {
            state.user = Some(SessionUser::Record(record));
            state.session = Some(session.clone());
        });

        Ok(session)
    }

    fn reject_login(&self) -> SessionError {
        tracing::debug!("Login rejected: no user with this security code");
        self.notify(Notification::invalid_security_code());
        SessionError::InvalidSecurityCode
    }

    /// End the backend identity session, then clear local state.
    ///
    /// On failure the local session is kept.
    pub async fn logout(&self) -> Result<(), SessionError> {
        if let Err(e) = self.backend.end_identity_session().await {
            tracing::warn!("Sign-out failed, keeping session: {}", e);
            return Err(e.into());
        }

        self.state.send_modify(|state| {
            state.user = None;
            state.session = None;
        });
        tracing::info!("Logged out");
        Ok(())
    }

    /// Create a user record. Does not log the new user in.
    pub async fn register(&self, username: &str, code: &str) -> Result<UserRecord, SessionError> {
        let security_code = parse_security_code(code)
            .ok_or(SessionError::MalformedSecurityCode)?;
        let record = NewUserRecord::new(username.trim(), security_code);

        match self.backend.insert_user(record).await {
            Ok(created) => {
                tracing::info!("Registered user {}", created.id);
                Ok(created)
            }
            Err(e) if e.is_unique_violation() => {
                self.notify(Notification::security_code_taken());
                Err(SessionError::SecurityCodeTaken(e.to_string()))
            }
            Err(e) => {
                tracing::error!("Registration failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Clear the session if it has expired. Returns true when one was cleared.
    pub fn expire_stale(&self) -> bool {
        let now = Utc::now();
        let expired = self.state.send_if_modified(|state| {
            let expired = state
                .session
                .as_ref()
                .is_some_and(|session| session.is_expired_at(now));
            if expired {
                state.session = None;
                state.user = None;
            }
            expired
        });
        if expired {
            tracing::info!("Session expired");
        }
        expired
    }

    /// Current state snapshot, with an expired session already cleared
    pub fn state(&self) -> SessionState {
        self.expire_stale();
        self.state.borrow().clone()
    }

    /// Current unexpired session
    pub fn session(&self) -> Option<Session> {
        self.state().session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Receive notifications emitted from now on
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    #[cfg(test)]
    fn is_listening(&self) -> bool {
        self.listener
            .lock()
            .map(|listener| listener.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Stop following backend identity changes and release the subscription
    pub async fn shutdown(&self) {
        let handle = self
            .listener
            .lock()
            .ok()
            .and_then(|mut listener| listener.take());
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
            tracing::debug!("Session manager shut down");
        }
    }

    /// Publish a notification to every current listener
    pub fn notify(&self, notification: Notification) {
        // Fire-and-forget: nobody listening is fine
        let _ = self.notifications.send(notification);
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Ok(listener) = self.listener.get_mut() {
            if let Some(handle) = listener.take() {
                handle.abort();
            }
        }
    }
}

fn apply_identity_change(
    state: &watch::Sender<SessionState>,
    change: IdentityChange,
    ttl: Duration,
) {
    state.send_modify(|state| {
        match change {
            Some(identity) => {
                state.session = Some(Session::start(identity.clone(), ttl));
                state.user = Some(SessionUser::Identity(identity));
            }
            None => {
                state.session = None;
                state.user = None;
            }
        }
        state.loading = false;
    });
}

/// Integer value of an entered security code
pub fn parse_security_code(code: &str) -> Option<i64> {
    code.trim().parse::<i64>().ok()
}
