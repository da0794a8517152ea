//! Identity repository
//!
//! Persistence for the backend's own authenticated identities. The most
//! recently created identity is the one a restarted process restores.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Identity;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Identity repository trait
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Persist a new identity
    async fn create(&self, identity: &Identity) -> Result<Identity>;

    /// Most recently created identity, if any
    async fn latest(&self) -> Result<Option<Identity>>;

    /// Remove every identity; returns how many were removed
    async fn delete_all(&self) -> Result<u64>;
}

/// SQLx-based identity repository implementation
pub struct SqlxIdentityRepository {
    pool: DynDatabasePool,
}

impl SqlxIdentityRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn IdentityRepository> {
        Arc::new(Self::new(pool))
    }

    fn sqlite(&self) -> Result<&SqlitePool> {
        self.pool
            .as_sqlite()
            .ok_or_else(|| anyhow!("SQLite pool not available"))
    }

    fn mysql(&self) -> Result<&MySqlPool> {
        self.pool
            .as_mysql()
            .ok_or_else(|| anyhow!("MySQL pool not available"))
    }
}

const INSERT_IDENTITY: &str = r#"
    INSERT INTO auth_identities (id, user_id, created_at)
    VALUES (?, ?, ?)
"#;

const SELECT_LATEST: &str = r#"
    SELECT id, user_id, created_at
    FROM auth_identities
    ORDER BY created_at DESC
    LIMIT 1
"#;

#[async_trait]
impl IdentityRepository for SqlxIdentityRepository {
    async fn create(&self, identity: &Identity) -> Result<Identity> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(INSERT_IDENTITY)
                    .bind(&identity.id)
                    .bind(identity.user_id)
                    .bind(identity.created_at)
                    .execute(self.sqlite()?)
                    .await
                    .context("Failed to create identity")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(INSERT_IDENTITY)
                    .bind(&identity.id)
                    .bind(identity.user_id)
                    .bind(identity.created_at)
                    .execute(self.mysql()?)
                    .await
                    .context("Failed to create identity")?;
            }
        }
        Ok(identity.clone())
    }

    async fn latest(&self) -> Result<Option<Identity>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(SELECT_LATEST)
                    .fetch_optional(self.sqlite()?)
                    .await
                    .context("Failed to get latest identity")?;
                row.map(|row| -> Result<Identity> {
                    Ok(Identity {
                        id: row.try_get("id")?,
                        user_id: row.try_get("user_id")?,
                        created_at: row.try_get("created_at")?,
                    })
                })
                .transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(SELECT_LATEST)
                    .fetch_optional(self.mysql()?)
                    .await
                    .context("Failed to get latest identity")?;
                row.map(|row| -> Result<Identity> {
                    Ok(Identity {
                        id: row.try_get("id")?,
                        user_id: row.try_get("user_id")?,
                        created_at: row.try_get("created_at")?,
                    })
                })
                .transpose()
            }
        }
    }

    async fn delete_all(&self) -> Result<u64> {
        const SQL: &str = "DELETE FROM auth_identities";
        let result = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(SQL)
                .execute(self.sqlite()?)
                .await
                .context("Failed to delete identities")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(SQL)
                .execute(self.mysql()?)
                .await
                .context("Failed to delete identities")?
                .rows_affected(),
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::{Duration, Utc};

    async fn setup_test_repo() -> SqlxIdentityRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxIdentityRepository::new(pool)
    }

    #[tokio::test]
    async fn test_latest_is_none_when_empty() {
        let repo = setup_test_repo().await;

        let latest = repo.latest().await.expect("Failed to get latest identity");

        assert!(latest.is_none());
    }

    #[tokio::test]
    async fn test_latest_returns_newest_identity() {
        let repo = setup_test_repo().await;
        let mut older = Identity::new(None);
        older.created_at = Utc::now() - Duration::hours(2);
        let newer = Identity::new(None);

        repo.create(&older).await.expect("Failed to create identity");
        repo.create(&newer).await.expect("Failed to create identity");

        let latest = repo.latest().await.unwrap().expect("Identity not found");
        assert_eq!(latest.id, newer.id);
        assert_eq!(latest.user_id, None);
    }

    #[tokio::test]
    async fn test_delete_all() {
        let repo = setup_test_repo().await;
        repo.create(&Identity::new(None)).await.unwrap();
        repo.create(&Identity::new(None)).await.unwrap();

        let removed = repo.delete_all().await.expect("Failed to delete identities");

        assert_eq!(removed, 2);
        assert!(repo.latest().await.unwrap().is_none());
        assert_eq!(repo.delete_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_identity_with_unknown_user_is_rejected() {
        let repo = setup_test_repo().await;

        let result = repo.create(&Identity::new(Some(999))).await;

        assert!(result.is_err(), "foreign key to users must hold");
    }
}
