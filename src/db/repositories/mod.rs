//! Database repositories
//!
//! Repository pattern implementations for database access.

pub mod identity;
pub mod user;

pub use identity::{IdentityRepository, SqlxIdentityRepository};
pub use user::{SqlxUserRepository, UserRepository};
