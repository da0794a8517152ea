//! User repository
//!
//! Database operations for user records.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{NewUserRecord, UserRecord};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new record. Fails on a duplicate security code.
    async fn create(&self, user: &NewUserRecord) -> Result<UserRecord>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<UserRecord>>;

    /// Get the user holding a security code
    async fn get_by_security_code(&self, code: i64) -> Result<Option<UserRecord>>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
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

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &NewUserRecord) -> Result<UserRecord> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.sqlite()?, user).await,
            DatabaseDriver::Mysql => create_user_mysql(self.mysql()?, user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<UserRecord>> {
        const SQL: &str = "SELECT id, username, security_code, created_at FROM users WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(SQL)
                    .bind(id)
                    .fetch_optional(self.sqlite()?)
                    .await
                    .context("Failed to get user by ID")?;
                row.as_ref().map(row_to_user_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(SQL)
                    .bind(id)
                    .fetch_optional(self.mysql()?)
                    .await
                    .context("Failed to get user by ID")?;
                row.as_ref().map(row_to_user_mysql).transpose()
            }
        }
    }

    async fn get_by_security_code(&self, code: i64) -> Result<Option<UserRecord>> {
        const SQL: &str =
            "SELECT id, username, security_code, created_at FROM users WHERE security_code = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(SQL)
                    .bind(code)
                    .fetch_optional(self.sqlite()?)
                    .await
                    .context("Failed to get user by security code")?;
                row.as_ref().map(row_to_user_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(SQL)
                    .bind(code)
                    .fetch_optional(self.mysql()?)
                    .await
                    .context("Failed to get user by security code")?;
                row.as_ref().map(row_to_user_mysql).transpose()
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &NewUserRecord) -> Result<UserRecord> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, security_code, created_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(user.security_code)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(UserRecord {
        id: result.last_insert_rowid(),
        username: user.username.clone(),
        security_code: user.security_code,
        created_at: now,
    })
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<UserRecord> {
    Ok(UserRecord {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        security_code: row.try_get("security_code")?,
        created_at: row.try_get("created_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &NewUserRecord) -> Result<UserRecord> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, security_code, created_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(user.security_code)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(UserRecord {
        id: i64::try_from(result.last_insert_id()).context("User ID out of range")?,
        username: user.username.clone(),
        security_code: user.security_code,
        created_at: now,
    })
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<UserRecord> {
    let security_code: i32 = row.try_get("security_code")?;
    Ok(UserRecord {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        security_code: i64::from(security_code),
        created_at: row.try_get("created_at")?,
    })
}
