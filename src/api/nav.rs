//! Navigation API endpoints

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::AppState;
use crate::services::navigation::{nav_bar, NavBar, HOME_PATH};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_nav))
}

#[derive(Debug, Deserialize)]
pub struct NavQuery {
    pub path: Option<String>,
}

/// GET /api/v1/nav?path= - Navigation bar for the current screen
async fn get_nav(State(state): State<AppState>, Query(query): Query<NavQuery>) -> Json<NavBar> {
    let path = query.path.as_deref().unwrap_or(HOME_PATH);
    Json(nav_bar(path, state.session_manager.is_authenticated()))
}
