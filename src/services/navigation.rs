//! Navigation rules
//!
//! Where a screen sends the client given the current session state, and
//! what the navigation bar offers.

use serde::Serialize;

use super::session::SessionState;

pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";

/// Brand shown in the navigation bar
pub const BRAND: &str = "DialAuth";

/// Screens served by the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Login,
    Register,
}

/// Redirect a screen should perform, if any.
///
/// Nothing redirects while the session state is still loading.
pub fn redirect_for(screen: Screen, state: &SessionState) -> Option<&'static str> {
    if state.loading {
        return None;
    }
    match (screen, state.is_authenticated()) {
        (Screen::Login | Screen::Register, true) => Some(HOME_PATH),
        (Screen::Home, false) => Some(LOGIN_PATH),
        _ => None,
    }
}

/// Action offered on the right of the navigation bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NavAction {
    Logout,
    Register,
    Login,
}

impl NavAction {
    pub fn path(self) -> Option<&'static str> {
        match self {
            NavAction::Logout => None,
            NavAction::Register => Some(REGISTER_PATH),
            NavAction::Login => Some(LOGIN_PATH),
        }
    }
}

/// Navigation bar model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavBar {
    pub brand: &'static str,
    pub action: NavAction,
    pub href: Option<&'static str>,
}

/// Navigation bar for the current path
pub fn nav_bar(path: &str, authenticated: bool) -> NavBar {
    let action = if authenticated {
        NavAction::Logout
    } else if path == LOGIN_PATH {
        NavAction::Register
    } else {
        NavAction::Login
    };
    NavBar {
        brand: BRAND,
        action,
        href: action.path(),
    }
}
