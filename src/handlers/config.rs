use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::error::{ApiError, FieldError};
use crate::models::{AppState, ClientConfig, ConfigDraft, Notification, RealmSettings, TokenLifespans};
use crate::services::{assemble, to_export_json, EXPORT_FILE_NAME};

use super::helpers::{ensure_session, ok_json, push_notifications};

fn draft_for(state: &AppState, sid: &str) -> ConfigDraft {
    let session = state.session(sid);
    let draft = session.config.lock().unwrap().clone();
    draft
}

fn render(draft: &ConfigDraft) -> Response {
    let document = assemble(&draft.realm, &draft.client, &draft.tokens);
    ok_json(json!({ "draft": draft, "document": document }))
}

/// Apply one section of the draft and answer with the re-assembled document.
fn update_draft(
    state: &AppState,
    jar: CookieJar,
    apply: impl FnOnce(&mut ConfigDraft) -> Result<(), ApiError>,
) -> Response {
    let (jar, sid) = ensure_session(jar);
    let session = state.session(&sid);
    let outcome = {
        let mut draft = session.config.lock().unwrap();
        apply(&mut draft).map(|()| draft.clone())
    };
    match outcome {
        Ok(draft) => {
            push_notifications(state, &sid, vec![Notification::success("Configuration saved")]);
            (jar, render(&draft)).into_response()
        }
        Err(e) => (jar, e).into_response(),
    }
}

pub async fn config_get(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (jar, sid) = ensure_session(jar);
    (jar, render(&draft_for(&state, &sid))).into_response()
}

pub async fn realm_put(State(state): State<AppState>, jar: CookieJar, Json(realm): Json<RealmSettings>) -> Response {
    update_draft(&state, jar, |draft| {
        if realm.realm.trim().is_empty() {
            return Err(ApiError::validation("realm", "must not be empty"));
        }
        if !matches!(realm.ssl_required.as_str(), "none" | "external" | "all") {
            return Err(ApiError::validation("sslRequired", "must be one of none, external, all"));
        }
        draft.realm = realm;
        Ok(())
    })
}

pub async fn client_put(State(state): State<AppState>, jar: CookieJar, Json(client): Json<ClientConfig>) -> Response {
    update_draft(&state, jar, |draft| {
        if client.client_id.trim().is_empty() {
            return Err(ApiError::validation("clientId", "must not be empty"));
        }
        draft.client = client;
        Ok(())
    })
}

pub async fn tokens_put(State(state): State<AppState>, jar: CookieJar, Json(tokens): Json<TokenLifespans>) -> Response {
    update_draft(&state, jar, |draft| {
        let fields = [
            ("accessTokenLifespan", tokens.access_token_lifespan),
            ("accessCodeLifespan", tokens.access_code_lifespan),
            ("ssoSessionIdleTimeout", tokens.sso_session_idle_timeout),
            ("ssoSessionMaxLifespan", tokens.sso_session_max_lifespan),
            ("offlineSessionIdleTimeout", tokens.offline_session_idle_timeout),
        ];
        let errors: Vec<FieldError> = fields
            .iter()
            .filter(|(_, secs)| *secs == 0)
            .map(|(name, _)| FieldError::new(name, "must be greater than zero"))
            .collect();
        if !errors.is_empty() {
            return Err(ApiError::ValidationFailed(errors));
        }
        draft.tokens = tokens;
        Ok(())
    })
}

/// Pretty JSON download named `keycloak-config.json`.
pub async fn config_export(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (jar, sid) = ensure_session(jar);
    let draft = draft_for(&state, &sid);
    let document = assemble(&draft.realm, &draft.client, &draft.tokens);
    match to_export_json(&document) {
        Ok(body) => (
            jar,
            [
                (CONTENT_TYPE, "application/json".to_string()),
                (CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME)),
            ],
            body,
        )
            .into_response(),
        Err(e) => (jar, ApiError::InvalidResponse(format!("Failed to serialize config: {}", e))).into_response(),
    }
}
