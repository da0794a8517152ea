//! Data models
//!
//! - Persisted entities owned by the backend (`UserRecord`, `Identity`)
//! - The process-local `Session` and the user it asserts
//! - User-visible `Notification`s

mod identity;
mod notification;
mod session;
mod user;

pub use identity::Identity;
pub use notification::{Notification, Severity};
pub use session::{Session, SessionUser};
pub use user::{NewUserRecord, UserRecord};
