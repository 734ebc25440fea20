use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};

use super::client::{send, Payload, UpstreamResponse};
use crate::error::ApiError;
use crate::models::{AuthSession, AuthToken, Credentials};
use crate::utils::join_url;

pub const SUBJECT_TOKEN_HEADER: &str = "x-subject-token";

/// Keystone v3 password authentication body, project scoped when a project
/// id is configured.
pub fn password_auth_body(credentials: &Credentials) -> Value {
    let mut body = json!({
        "auth": {
            "identity": {
                "methods": ["password"],
                "password": {
                    "user": {
                        "name": credentials.username,
                        "domain": { "name": credentials.user_domain },
                        "password": credentials.password,
                    }
                }
            }
        }
    });
    if let Some(project_id) = credentials.project_id.as_deref().filter(|p| !p.is_empty()) {
        body["auth"]["scope"] = json!({ "project": { "id": project_id } });
    }
    body
}

/// Build the session from a successful `POST /auth/tokens` response. The
/// subject token only ever arrives in the response header.
pub fn session_from_response(resp: &UpstreamResponse) -> Result<AuthSession, ApiError> {
    let raw_token = resp.header(SUBJECT_TOKEN_HEADER).unwrap_or("");
    let token = AuthToken::parse(raw_token)
        .map_err(|_| ApiError::AuthRejected("identity response carried no subject token".into()))?;

    let user_id = resp
        .body
        .pointer("/token/user/id")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::InvalidResponse("token body has no user id".into()))?
        .to_string();

    let expires_at = resp
        .body
        .pointer("/token/expires_at")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc));

    Ok(AuthSession {
        token,
        user_id,
        expires_at,
    })
}

pub async fn authenticate(
    client: &reqwest::Client,
    identity_url: &str,
    credentials: &Credentials,
) -> Result<AuthSession, ApiError> {
    let url = join_url(identity_url, "/auth/tokens");
    let body = password_auth_body(credentials);
    let resp = send(client, Method::POST, &url, &[], Payload::Json(&body)).await?;
    let session = session_from_response(&resp)?;
    tracing::info!(user_id = %session.user_id, expires_at = ?session.expires_at, "OpenStack session issued");
    Ok(session)
}
