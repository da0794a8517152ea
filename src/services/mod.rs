//! Services layer - Business logic
//!
//! - `session`: the session manager shared by every screen
//! - `validation`: login and registration form checks
//! - `navigation`: redirect rules and the navigation bar model

pub mod navigation;
pub mod session;
pub mod validation;

pub use navigation::{nav_bar, redirect_for, NavAction, NavBar, Screen};
pub use session::{parse_security_code, SessionError, SessionManager, SessionState};
pub use validation::{validate_login_code, validate_registration, ValidationError};
