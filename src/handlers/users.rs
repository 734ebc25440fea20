use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;

use crate::error::ApiError;
use crate::models::{AppState, KeycloakUser, Notification, UserPatch};
use crate::services::UserQuery;

use super::helpers::{ensure_session, json_with_status, ok_json, push_notifications};
use super::middleware::AdminBearer;

pub async fn users_list(
    State(state): State<AppState>,
    jar: CookieJar,
    AdminBearer(token): AdminBearer,
    Query(query): Query<UserQuery>,
) -> Response {
    let (jar, sid) = ensure_session(jar);
    let mut directory = state.users.lock().await;
    let result = directory.refresh(state.keycloak.as_ref(), &token).await;
    let mut notes = directory.take_notifications();
    if result.is_ok() {
        notes.push(Notification::success("Users fetched successfully"));
    }
    push_notifications(&state, &sid, notes);
    match result {
        Ok(()) => (jar, ok_json(directory.view(&query))).into_response(),
        Err(e) => (jar, e).into_response(),
    }
}

pub async fn users_create(
    State(state): State<AppState>,
    jar: CookieJar,
    AdminBearer(token): AdminBearer,
    Json(user): Json<KeycloakUser>,
) -> Response {
    let (jar, sid) = ensure_session(jar);
    let mut directory = state.users.lock().await;
    let result = directory.create(state.keycloak.as_ref(), &token, user).await;
    push_notifications(&state, &sid, directory.take_notifications());
    respond(jar, result, StatusCode::CREATED, || directory.view(&UserQuery::default()))
}

pub async fn users_update(
    State(state): State<AppState>,
    jar: CookieJar,
    AdminBearer(token): AdminBearer,
    Path(user_id): Path<String>,
    Json(patch): Json<UserPatch>,
) -> Response {
    let (jar, sid) = ensure_session(jar);
    let mut directory = state.users.lock().await;
    let result = directory
        .patch(state.keycloak.as_ref(), &token, &user_id, patch)
        .await;
    push_notifications(&state, &sid, directory.take_notifications());
    respond(jar, result, StatusCode::OK, || directory.view(&UserQuery::default()))
}

pub async fn users_delete(
    State(state): State<AppState>,
    jar: CookieJar,
    AdminBearer(token): AdminBearer,
    Path(user_id): Path<String>,
) -> Response {
    let (jar, sid) = ensure_session(jar);
    let mut directory = state.users.lock().await;
    let result = directory.delete(state.keycloak.as_ref(), &token, &user_id).await;
    push_notifications(&state, &sid, directory.take_notifications());
    respond(jar, result, StatusCode::OK, || directory.view(&UserQuery::default()))
}

fn respond<T: serde::Serialize>(
    jar: CookieJar,
    result: Result<(), ApiError>,
    status: StatusCode,
    view: impl FnOnce() -> T,
) -> Response {
    match result {
        Ok(()) => (jar, json_with_status(status, view())).into_response(),
        Err(e) => (jar, e).into_response(),
    }
}
