//! API layer - HTTP handlers and routing
//!
//! The screens of the application as JSON endpoints:
//! - Auth endpoints (session, login, register, logout)
//! - Home endpoint
//! - Navigation bar endpoint
//! - Notification event stream

pub mod auth;
pub mod events;
pub mod home;
pub mod middleware;
pub mod nav;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState};

/// Build the main API router
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/home", home::router())
        .nest("/nav", nav::router())
        .nest("/events", events::router())
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Ok(Router::new()
        .nest("/api/v1", build_api_router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::backend::SqlxBackend;
    use crate::db::{create_test_pool, migrations};
    use crate::services::SessionManager;
    use axum_test::TestServer;
    use std::sync::Arc;

    pub const TEST_ORIGIN: &str = "http://localhost:3000";

    /// App state over an in-memory database
    pub async fn setup_state(initialize: bool) -> (AppState, Arc<SqlxBackend>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let backend = Arc::new(SqlxBackend::new(pool));
        let manager = Arc::new(SessionManager::new(backend.clone()));
        if initialize {
            manager.initialize().await.expect("Failed to initialize");
        }
        (AppState::new(manager, backend.clone()), backend)
    }

    pub fn test_server(state: AppState) -> TestServer {
        let router = build_router(state, TEST_ORIGIN).expect("Failed to build router");
        TestServer::new(router).expect("Failed to start test server")
    }

    pub async fn setup_test_server() -> (TestServer, Arc<SessionManager>) {
        let (state, _) = setup_state(true).await;
        let manager = state.session_manager.clone();
        (test_server(state), manager)
    }
}
