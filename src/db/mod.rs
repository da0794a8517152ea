//! Database layer
//!
//! Persistence for user records and backend identities. Supports:
//! - SQLite (default, single-file deployment)
//! - MySQL
//!
//! The driver is selected by configuration; repositories dispatch on
//! `DatabasePool::driver()`.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
