use axum::extract::State;
use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::api::identity::SUBJECT_TOKEN_HEADER;
use crate::error::ApiError;
use crate::models::{AppState, AuthSession, Credentials, InstanceRequest, Notification};
use crate::services::{clear_session, CookieStore, CredentialStore, USER_ID_KEY};
use crate::wizard::ServerInstanceForm;

use super::helpers::{ensure_session, ok_json, push_notifications, remember_openstack_session, session_id_from_jar};
use super::middleware::XAuthToken;

pub async fn flavors_get(State(state): State<AppState>, XAuthToken(token): XAuthToken) -> Result<Response, ApiError> {
    let flavors = state.openstack.list_flavors(&token).await?;
    Ok(ok_json(flavors))
}

pub async fn keypairs_get(State(state): State<AppState>, XAuthToken(token): XAuthToken) -> Result<Response, ApiError> {
    let keypairs = state.openstack.list_keypairs(&token).await?;
    Ok(ok_json(keypairs))
}

pub async fn networks_get(State(state): State<AppState>, XAuthToken(token): XAuthToken) -> Result<Response, ApiError> {
    let networks = state.openstack.list_networks(&token).await?;
    Ok(ok_json(networks))
}

/// Password authentication. The subject token is echoed in `X-Subject-Token`
/// and remembered in cookies; the body only carries the user id and expiry.
pub async fn auth_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(credentials): Json<Credentials>,
) -> Response {
    let (jar, sid) = ensure_session(jar);
    match state.openstack.authenticate(&credentials).await {
        Ok(session) => {
            push_notifications(
                &state,
                &sid,
                vec![Notification::success("OpenStack API access granted successfully")],
            );
            let header = match HeaderValue::from_str(session.token.as_str()) {
                Ok(v) => v,
                Err(_) => {
                    return (jar, ApiError::InvalidResponse("subject token is not a valid header value".into()))
                        .into_response()
                }
            };
            let jar = remember_openstack_session(jar, &session);
            let mut response = ok_json(session.summary());
            response
                .headers_mut()
                .insert(HeaderName::from_static(SUBJECT_TOKEN_HEADER), header);
            (jar, response).into_response()
        }
        Err(e) => {
            let message = match &e {
                ApiError::AuthRejected(_) => "Invalid credentials",
                _ => "Could not reach OpenStack Identity",
            };
            tracing::warn!(error = %e, "OpenStack authentication failed");
            push_notifications(&state, &sid, vec![Notification::error(message)]);
            (jar, e).into_response()
        }
    }
}

/// One creation request for the caller's token. The requesting user id comes
/// from the cookie written at authentication.
pub async fn instances_post(
    State(state): State<AppState>,
    jar: CookieJar,
    XAuthToken(token): XAuthToken,
    Json(request): Json<InstanceRequest>,
) -> Result<Response, ApiError> {
    let request = ServerInstanceForm {
        flavor: request.flavor,
        keypair: request.keypair,
        network: request.network,
        port: request.keycloak_port,
    }
    .validate()?;
    let user_id = CookieStore::new(jar).get(USER_ID_KEY).unwrap_or_default();
    let session = AuthSession {
        token,
        user_id,
        expires_at: None,
    };
    let instance = state.openstack.create_instance(&request, &session).await?;
    Ok(ok_json(instance))
}

/// Forget the OpenStack cookies and the console session behind them.
pub async fn logout_post(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(sid) = session_id_from_jar(&jar) {
        state.drop_session(&sid);
    }
    let mut store = CookieStore::new(jar);
    clear_session(&mut store);
    (store.into_jar(), ok_json(json!({ "loggedOut": true })))
}
