//! Database-backed implementation of the backend collaborator

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::{AuthBackend, BackendError, IdentityChange, IdentitySubscription, UserFilter};
use crate::db::repositories::{
    IdentityRepository, SqlxIdentityRepository, SqlxUserRepository, UserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{Identity, NewUserRecord, UserRecord};

const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Backend over the `users` and `auth_identities` tables.
///
/// Identity changes are published to every live subscription.
pub struct SqlxBackend {
    users: Arc<dyn UserRepository>,
    identities: Arc<dyn IdentityRepository>,
    changes: broadcast::Sender<IdentityChange>,
}

impl SqlxBackend {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self::with_repositories(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxIdentityRepository::boxed(pool),
        )
    }

    pub fn with_repositories(
        users: Arc<dyn UserRepository>,
        identities: Arc<dyn IdentityRepository>,
    ) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            users,
            identities,
            changes,
        }
    }

    /// Start a new identity session and announce it to subscribers
    pub async fn start_identity_session(
        &self,
        user_id: Option<i64>,
    ) -> Result<Identity, BackendError> {
        let identity = self
            .identities
            .create(&Identity::new(user_id))
            .await
            .map_err(|e| BackendError::Auth(format!("{:#}", e)))?;
        tracing::info!("Identity session started: {}", identity.id);
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    fn publish(&self, change: IdentityChange) {
        // No subscribers is not an error
        let _ = self.changes.send(change);
    }
}

/// Map a repository failure onto the backend error surface
fn classify(err: anyhow::Error) -> BackendError {
    let unique = err
        .downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .filter(|db| db.is_unique_violation())
        .map(|db| db.message().to_string());

    match unique {
        Some(message) => BackendError::unique_violation(message),
        None => BackendError::Query(format!("{:#}", err)),
    }
}

#[async_trait]
impl AuthBackend for SqlxBackend {
    async fn current_identity(&self) -> Result<Option<Identity>, BackendError> {
        self.identities
            .latest()
            .await
            .map_err(|e| BackendError::Auth(format!("{:#}", e)))
    }

    fn subscribe(&self) -> IdentitySubscription {
        IdentitySubscription::new(self.changes.subscribe())
    }

    async fn find_user(&self, filter: UserFilter) -> Result<Option<UserRecord>, BackendError> {
        let result = match filter {
            UserFilter::Id(id) => self.users.get_by_id(id).await,
            UserFilter::SecurityCode(code) => self.users.get_by_security_code(code).await,
        };
        result.map_err(classify)
    }

    async fn insert_user(&self, user: NewUserRecord) -> Result<UserRecord, BackendError> {
        let created = self.users.create(&user).await.map_err(classify)?;
        tracing::debug!("User record created: {}", created.id);
        Ok(created)
    }

    async fn end_identity_session(&self) -> Result<(), BackendError> {
        let removed = self
            .identities
            .delete_all()
            .await
            .map_err(|e| BackendError::Auth(format!("{:#}", e)))?;
        tracing::info!("Identity session ended ({} identity record(s) removed)", removed);
        self.publish(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_backend() -> SqlxBackend {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxBackend::new(pool)
    }

    #[tokio::test]
    async fn test_insert_and_find_user() {
        let backend = setup_backend().await;

        let created = backend
            .insert_user(NewUserRecord::new("alice", 4821))
            .await
            .expect("Failed to insert user");

        let by_code = backend
            .find_user(UserFilter::SecurityCode(4821))
            .await
            .unwrap()
            .expect("User not found");
        assert_eq!(by_code.id, created.id);
        assert_eq!(by_code.username, "alice");

        let by_id = backend
            .find_user(UserFilter::Id(created.id))
            .await
            .unwrap()
            .expect("User not found");
        assert_eq!(by_id.security_code, 4821);

        let missing = backend.find_user(UserFilter::SecurityCode(1)).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_security_code_is_unique_violation() {
        let backend = setup_backend().await;
        backend
            .insert_user(NewUserRecord::new("alice", 4821))
            .await
            .unwrap();

        let err = backend
            .insert_user(NewUserRecord::new("bob", 4821))
            .await
            .expect_err("duplicate code must be rejected");

        assert!(err.is_unique_violation());
        assert_eq!(err.code(), Some(crate::backend::UNIQUE_VIOLATION_CODE));
    }

    #[tokio::test]
    async fn test_query_failure_is_not_unique_violation() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        // No migrations: the users table does not exist
        let backend = SqlxBackend::new(pool);

        let err = backend
            .find_user(UserFilter::SecurityCode(4821))
            .await
            .expect_err("query against missing table must fail");

        assert!(matches!(err, BackendError::Query(_)));
        assert!(!err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_identity_session_lifecycle_is_published() {
        let backend = setup_backend().await;
        let mut subscription = backend.subscribe();
        assert_eq!(backend.subscriber_count(), 1);

        assert!(backend.current_identity().await.unwrap().is_none());

        let identity = backend.start_identity_session(None).await.unwrap();
        assert_eq!(subscription.recv().await, Some(Some(identity.clone())));
        let restored = backend.current_identity().await.unwrap().expect("identity stored");
        assert_eq!(restored.id, identity.id);

        backend.end_identity_session().await.unwrap();
        assert_eq!(subscription.recv().await, Some(None));
        assert!(backend.current_identity().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_released() {
        let backend = setup_backend().await;
        let subscription = backend.subscribe();
        assert_eq!(backend.subscriber_count(), 1);

        drop(subscription);

        assert_eq!(backend.subscriber_count(), 0);
        backend
            .end_identity_session()
            .await
            .expect("ending without subscribers succeeds");
    }
}
