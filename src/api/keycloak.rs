use reqwest::Method;

use super::client::{send, Payload};
use crate::error::ApiError;
use crate::models::{AuthToken, KeycloakUser};
use crate::utils::{join_url, path_segment};

const ADMIN_CLIENT_ID: &str = "admin-cli";

fn bearer(token: &AuthToken) -> String {
    format!("Bearer {}", token.as_str())
}

fn users_url(base_url: &str, realm: &str) -> String {
    join_url(base_url, &format!("/admin/realms/{}/users", path_segment(realm)))
}

fn user_url(base_url: &str, realm: &str, user_id: &str) -> String {
    format!("{}/{}", users_url(base_url, realm), path_segment(user_id))
}

/// Password grant against `admin-cli` in the master realm.
pub async fn obtain_admin_token(
    client: &reqwest::Client,
    base_url: &str,
    username: &str,
    password: &str,
) -> Result<AuthToken, ApiError> {
    let url = join_url(base_url, "/realms/master/protocol/openid-connect/token");
    let form = [
        ("grant_type", "password"),
        ("client_id", ADMIN_CLIENT_ID),
        ("username", username),
        ("password", password),
    ];
    let resp = send(client, Method::POST, &url, &[], Payload::Form(&form)).await?;
    let raw = resp
        .body
        .get("access_token")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    AuthToken::parse(raw).map_err(|_| ApiError::AuthRejected("token endpoint returned no access_token".into()))
}

pub async fn list_users(
    client: &reqwest::Client,
    base_url: &str,
    realm: &str,
    token: &AuthToken,
) -> Result<Vec<KeycloakUser>, ApiError> {
    let url = users_url(base_url, realm);
    let auth = bearer(token);
    let resp = send(client, Method::GET, &url, &[("Authorization", auth.as_str())], Payload::Empty).await?;
    serde_json::from_value(resp.body).map_err(|e| ApiError::InvalidResponse(format!("users payload: {}", e)))
}

pub async fn create_user(
    client: &reqwest::Client,
    base_url: &str,
    realm: &str,
    token: &AuthToken,
    user: &KeycloakUser,
) -> Result<(), ApiError> {
    let url = users_url(base_url, realm);
    let auth = bearer(token);
    let body = serde_json::to_value(user).map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
    send(client, Method::POST, &url, &[("Authorization", auth.as_str())], Payload::Json(&body)).await?;
    Ok(())
}

pub async fn update_user(
    client: &reqwest::Client,
    base_url: &str,
    realm: &str,
    token: &AuthToken,
    user_id: &str,
    user: &KeycloakUser,
) -> Result<(), ApiError> {
    let url = user_url(base_url, realm, user_id);
    let auth = bearer(token);
    let body = serde_json::to_value(user).map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
    send(client, Method::PUT, &url, &[("Authorization", auth.as_str())], Payload::Json(&body)).await?;
    Ok(())
}

pub async fn delete_user(
    client: &reqwest::Client,
    base_url: &str,
    realm: &str,
    token: &AuthToken,
    user_id: &str,
) -> Result<(), ApiError> {
    let url = user_url(base_url, realm, user_id);
    let auth = bearer(token);
    send(client, Method::DELETE, &url, &[("Authorization", auth.as_str())], Payload::Empty).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_urls_escape_ids() {
        assert_eq!(
            user_url("http://kc:8080/", "my realm", "a/b"),
            "http://kc:8080/admin/realms/my%20realm/users/a%2Fb"
        );
    }
}
