//! Authentication API endpoints
//!
//! - GET /api/v1/auth/session - Current session state
//! - POST /api/v1/auth/login - Log in with a security code
//! - POST /api/v1/auth/register - Register a user record
//! - POST /api/v1/auth/logout - Log out

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Notification, SessionUser};
use crate::services::navigation::{HOME_PATH, LOGIN_PATH};
use crate::services::{
    redirect_for, validate_login_code, validate_registration, Screen, SessionState,
};

/// Request body for login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub code: String,
}

/// Request body for registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub code: String,
    pub re_enter_code: String,
}

/// Session state as seen by the client
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub loading: bool,
    pub authenticated: bool,
    pub user: Option<SessionUser>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<SessionState> for SessionResponse {
    fn from(state: SessionState) -> Self {
        Self {
            loading: state.loading,
            authenticated: state.is_authenticated(),
            expires_at: state.session.as_ref().map(|s| s.expires_at),
            user: state.user,
        }
    }
}

/// Outcome of a form submission and where the client goes next
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub session: SessionResponse,
    pub redirect: &'static str,
}

/// Build the auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session", get(get_session))
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
}

/// GET /api/v1/auth/session - Current session state
async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    Json(state.session_manager.state().into())
}

/// POST /api/v1/auth/login - Log in with a security code
///
/// Already signed-in clients are sent home without a new login.
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let manager = &state.session_manager;
    if let Some(redirect) = redirect_for(Screen::Login, &manager.state()) {
        return Ok(Json(AuthResponse {
            message: None,
            session: manager.state().into(),
            redirect,
        }));
    }

    validate_login_code(&body.code)?;
    manager.login(&body.code).await?;

    Ok(Json(AuthResponse {
        message: None,
        session: manager.state().into(),
        redirect: HOME_PATH,
    }))
}

/// POST /api/v1/auth/register - Register a user record
///
/// Registration does not sign the user in; the client continues to login.
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let manager = &state.session_manager;
    if let Some(redirect) = redirect_for(Screen::Register, &manager.state()) {
        let response = AuthResponse {
            message: None,
            session: manager.state().into(),
            redirect,
        };
        return Ok((StatusCode::OK, Json(response)));
    }

    validate_registration(&body.username, &body.code, &body.re_enter_code)?;
    let created = manager.register(&body.username, &body.code).await?;
    tracing::debug!("Registration accepted for user {}", created.id);
    manager.notify(Notification::registration_successful());

    let response = AuthResponse {
        message: Some("Registration successful!".to_string()),
        session: manager.state().into(),
        redirect: LOGIN_PATH,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/auth/logout - Log out
///
/// A failed sign-out keeps the session and reports the error.
async fn logout(State(state): State<AppState>) -> Result<Json<AuthResponse>, ApiError> {
    let manager = &state.session_manager;
    manager.logout().await?;

    Ok(Json(AuthResponse {
        message: None,
        session: manager.state().into(),
        redirect: LOGIN_PATH,
    }))
}
