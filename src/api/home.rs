//! Home screen endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::backend::UserFilter;
use crate::services::{redirect_for, Screen};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(home))
}

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<&'static str>,
}

/// GET /api/v1/home - Greeting for the signed-in user
///
/// While the session is still being resolved the screen reports
/// "Loading..." instead of redirecting.
async fn home(State(state): State<AppState>) -> Result<Json<HomeResponse>, ApiError> {
    let session_state = state.session_manager.state();
    if session_state.loading {
        return Err(ApiError::unavailable("Loading..."));
    }
    if let Some(redirect) = redirect_for(Screen::Home, &session_state) {
        return Ok(Json(HomeResponse {
            message: None,
            username: None,
            redirect: Some(redirect),
        }));
    }

    let record_id = session_state
        .session
        .and_then(|session| session.user.user_record_id());
    let record = match record_id {
        Some(id) => state
            .backend
            .find_user(UserFilter::Id(id))
            .await
            .map_err(|e| ApiError::backend_error(e.to_string()))?,
        None => None,
    };

    let response = match record {
        Some(record) => HomeResponse {
            message: Some(format!("Welcome, {}!", record.username)),
            username: Some(record.username),
            redirect: None,
        },
        None => HomeResponse {
            message: Some("User not found.".to_string()),
            username: None,
            redirect: None,
        },
    };
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{setup_state, setup_test_server, test_server};
    use axum::http::StatusCode;
    use serde_json::Value;

    #[tokio::test]
    async fn test_home_while_loading() {
        let (state, _) = setup_state(false).await;
        let server = test_server(state);

        let response = server.get("/api/v1/home").await;

        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = response.json();
        assert_eq!(body["error"]["message"], "Loading...");
    }

    #[tokio::test]
    async fn test_home_without_session_redirects_to_login() {
        let (server, _) = setup_test_server().await;

        let response = server.get("/api/v1/home").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["redirect"], "/login");
        assert!(body.get("message").is_none());
    }

    #[tokio::test]
    async fn test_home_greets_user() {
        let (server, manager) = setup_test_server().await;
        manager.register("alice", "4821").await.unwrap();
        manager.login("4821").await.unwrap();

        let response = server.get("/api/v1/home").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["message"], "Welcome, alice!");
        assert_eq!(body["username"], "alice");
    }

    #[tokio::test]
    async fn test_home_with_unlinked_identity() {
        let (state, backend) = setup_state(true).await;
        let manager = state.session_manager.clone();
        let server = test_server(state);
        let mut changes = manager.subscribe();

        backend.start_identity_session(None).await.unwrap();
        tokio::time::timeout(
            std::time::Duration::from_secs(2),
            changes.wait_for(|s| s.session.is_some()),
        )
        .await
        .expect("identity change applied")
        .unwrap();

        let response = server.get("/api/v1/home").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["message"], "User not found.");
    }

    #[tokio::test]
    async fn test_home_greets_linked_identity() {
        let (state, backend) = setup_state(true).await;
        let manager = state.session_manager.clone();
        let server = test_server(state);
        let record = manager.register("alice", "4821").await.unwrap();
        let mut changes = manager.subscribe();

        backend.start_identity_session(Some(record.id)).await.unwrap();
        tokio::time::timeout(
            std::time::Duration::from_secs(2),
            changes.wait_for(|s| s.session.is_some()),
        )
        .await
        .expect("identity change applied")
        .unwrap();

        let response = server.get("/api/v1/home").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["message"], "Welcome, alice!");
        assert_eq!(body["username"], "alice");
    }
}
