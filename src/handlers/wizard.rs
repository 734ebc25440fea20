use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::api::compute::AUTH_TOKEN_HEADER;
use crate::error::ApiError;
use crate::models::{AppState, AuthToken, Credentials};
use crate::services::{load_credentials, CookieStore};
use crate::wizard::{ServerInstanceForm, WizardController};

use super::helpers::{ensure_session, ok_json, push_notifications, remember_openstack_session};

#[derive(Deserialize)]
pub struct SubmitBody {
    #[serde(flatten)]
    pub form: ServerInstanceForm,
    #[serde(default)]
    pub credentials: Option<Credentials>,
}

#[derive(Deserialize, Default)]
pub struct RetryBody {
    #[serde(default)]
    pub credentials: Option<Credentials>,
}

/// Request credentials win over the configured default.
fn resolve_credentials(state: &AppState, supplied: Option<Credentials>) -> Result<Credentials, ApiError> {
    supplied
        .or_else(|| state.default_credentials.clone())
        .ok_or_else(|| ApiError::validation("credentials", "no OpenStack credentials supplied or configured"))
}

/// `X-Auth-Token` header first, then the token cookie.
fn reference_token(headers: &HeaderMap, jar: &CookieJar) -> Option<AuthToken> {
    let from_header = headers
        .get(AUTH_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| AuthToken::parse(v).ok());
    from_header.or_else(|| load_credentials(&CookieStore::new(jar.clone())).map(|(token, _)| token))
}

/// Flush notifications, refresh the token cookies and render the outcome.
fn finish(
    state: &AppState,
    sid: &str,
    jar: CookieJar,
    wizard: &mut WizardController,
    result: Result<(), ApiError>,
) -> Response {
    push_notifications(state, sid, wizard.take_notifications());
    let jar = match wizard.session() {
        Some(session) => remember_openstack_session(jar, session),
        None => jar,
    };
    match result {
        Ok(()) => (jar, ok_json(wizard.snapshot())).into_response(),
        Err(e) => (jar, e).into_response(),
    }
}

pub async fn wizard_get(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (jar, sid) = ensure_session(jar);
    let session = state.session(&sid);
    let mut wizard = session.wizard.lock().await;
    wizard.recover_interrupted();
    push_notifications(&state, &sid, wizard.take_notifications());
    (jar, ok_json(wizard.snapshot())).into_response()
}

pub async fn wizard_start(State(state): State<AppState>, jar: CookieJar, headers: HeaderMap) -> Response {
    let (jar, sid) = ensure_session(jar);
    let token = reference_token(&headers, &jar);
    let session = state.session(&sid);
    let mut wizard = session.wizard.lock().await;
    let result = wizard.start(state.openstack.as_ref(), token.as_ref()).await;
    finish(&state, &sid, jar, &mut wizard, result)
}

pub async fn wizard_submit(State(state): State<AppState>, jar: CookieJar, Json(body): Json<SubmitBody>) -> Response {
    let (jar, sid) = ensure_session(jar);
    let credentials = match resolve_credentials(&state, body.credentials) {
        Ok(c) => c,
        Err(e) => return (jar, e).into_response(),
    };
    let session = state.session(&sid);
    let mut wizard = session.wizard.lock().await;
    let result = wizard
        .submit(state.openstack.as_ref(), &body.form, &credentials)
        .await;
    finish(&state, &sid, jar, &mut wizard, result)
}

pub async fn wizard_retry(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RetryBody>>,
) -> Response {
    let (jar, sid) = ensure_session(jar);
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let credentials = match resolve_credentials(&state, body.credentials) {
        Ok(c) => c,
        Err(e) => return (jar, e).into_response(),
    };
    let session = state.session(&sid);
    let mut wizard = session.wizard.lock().await;
    let result = wizard.retry(state.openstack.as_ref(), &credentials).await;
    finish(&state, &sid, jar, &mut wizard, result)
}

pub async fn wizard_back(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (jar, sid) = ensure_session(jar);
    let session = state.session(&sid);
    let mut wizard = session.wizard.lock().await;
    let result = wizard.back();
    finish(&state, &sid, jar, &mut wizard, result)
}

/// Discarding the wizard ends the console session; the next request starts
/// from an empty one.
pub async fn wizard_delete(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (jar, sid) = ensure_session(jar);
    let session = state.session(&sid);
    session.wizard.lock().await.reset();
    state.drop_session(&sid);
    tracing::info!("Wizard discarded");
    (jar, ok_json(WizardController::new().snapshot())).into_response()
}
