//! API middleware
//!
//! Shared handler state and the JSON error type every handler returns.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::backend::DynAuthBackend;
use crate::models::Notification;
use crate::services::{SessionError, SessionManager, ValidationError};

#[derive(Clone)]
pub struct AppState {
    pub session_manager: Arc<SessionManager>,
    pub backend: DynAuthBackend,
}

impl AppState {
    pub fn new(session_manager: Arc<SessionManager>, backend: DynAuthBackend) -> Self {
        Self {
            session_manager,
            backend,
        }
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn backend_error(message: impl Into<String>) -> Self {
        Self::new("BACKEND_ERROR", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new("UNAVAILABLE", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "BACKEND_ERROR" => StatusCode::BAD_GATEWAY,
            "UNAVAILABLE" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::validation_error(err.0)
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidSecurityCode => {
                let notification = Notification::invalid_security_code();
                Self::unauthorized(notification.description)
            }
            SessionError::SecurityCodeTaken(reason) => {
                let notification = Notification::security_code_taken();
                Self::conflict(notification.description)
                    .with_details(serde_json::json!({ "reason": reason }))
            }
            SessionError::MalformedSecurityCode => Self::validation_error(err.to_string()),
            SessionError::Backend(e) => {
                tracing::error!("Backend error: {}", e);
                Self::backend_error(e.to_string())
            }
            SessionError::AlreadyInitialized => Self::internal_error(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (ApiError::validation_error("x"), StatusCode::BAD_REQUEST),
            (ApiError::conflict("x"), StatusCode::CONFLICT),
            (ApiError::backend_error("x"), StatusCode::BAD_GATEWAY),
            (ApiError::unavailable("x"), StatusCode::SERVICE_UNAVAILABLE),
            (ApiError::new("SOMETHING_ELSE", "x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_session_errors_become_displayable_messages() {
        let err = ApiError::from(SessionError::InvalidSecurityCode);
        assert_eq!(err.error.code, "UNAUTHORIZED");
        assert_eq!(err.error.message, "There is no user with this security code.");

        let err = ApiError::from(SessionError::SecurityCodeTaken("duplicate key".to_string()));
        assert_eq!(err.error.code, "CONFLICT");
        assert_eq!(
            err.error.message,
            "This security code is already in use. Please choose a different one."
        );
        assert_eq!(err.error.details.unwrap()["reason"], "duplicate key");

        let err = ApiError::from(SessionError::MalformedSecurityCode);
        assert_eq!(err.error.code, "VALIDATION_ERROR");
        assert_eq!(err.error.message, "Security code must be a 4-digit number.");

        let err = ApiError::from(SessionError::Backend(BackendError::Query("timeout".into())));
        assert_eq!(err.error.code, "BACKEND_ERROR");
        assert_eq!(err.error.message, "timeout");
    }
}
