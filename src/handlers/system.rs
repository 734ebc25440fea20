use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::models::AppState;

use super::helpers::{ok_json, session_id_from_jar};

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// Drain the caller's pending notifications.
pub async fn notifications_get(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let pending = match session_id_from_jar(&jar) {
        Some(sid) => state.notifications.drain(&sid),
        None => Vec::new(),
    };
    ok_json(pending)
}
