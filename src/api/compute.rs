use reqwest::Method;
use serde_json::{json, Value};

use super::client::{send, Payload};
use crate::error::ApiError;
use crate::models::{
    AuthSession, AuthToken, CreatedInstance, Flavor, FlavorList, InstanceRequest, Keypair, KeypairList,
    Network, NetworkList, ServerSettings,
};
use crate::utils::join_url;

pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

async fn get_json(
    client: &reqwest::Client,
    compute_url: &str,
    endpoint: &str,
    token: &AuthToken,
) -> Result<Value, ApiError> {
    let url = join_url(compute_url, endpoint);
    let resp = send(
        client,
        Method::GET,
        &url,
        &[(AUTH_TOKEN_HEADER, token.as_str())],
        Payload::Empty,
    )
    .await?;
    Ok(resp.body)
}

fn decode<T: serde::de::DeserializeOwned>(what: &str, body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::InvalidResponse(format!("{} payload: {}", what, e)))
}

pub async fn list_flavors(
    client: &reqwest::Client,
    compute_url: &str,
    token: &AuthToken,
) -> Result<Vec<Flavor>, ApiError> {
    let body = get_json(client, compute_url, "/flavors/detail", token).await?;
    let list: FlavorList = decode("flavors", body)?;
    tracing::debug!(count = list.flavors.len(), "Loaded flavors");
    Ok(list.flavors)
}

pub async fn list_keypairs(
    client: &reqwest::Client,
    compute_url: &str,
    token: &AuthToken,
) -> Result<Vec<Keypair>, ApiError> {
    let body = get_json(client, compute_url, "/os-keypairs", token).await?;
    let list: KeypairList = decode("keypairs", body)?;
    Ok(list.into_keypairs())
}

pub async fn list_networks(
    client: &reqwest::Client,
    compute_url: &str,
    token: &AuthToken,
) -> Result<Vec<Network>, ApiError> {
    let body = get_json(client, compute_url, "/os-networks", token).await?;
    let list: NetworkList = decode("networks", body)?;
    Ok(list.networks)
}

/// Nova `POST /servers` body for a Keycloak host.
pub fn server_create_body(settings: &ServerSettings, request: &InstanceRequest, user_id: &str) -> Value {
    json!({
        "server": {
            "name": settings.name,
            "imageRef": settings.image_id,
            "flavorRef": request.flavor,
            "key_name": request.keypair,
            "networks": [{ "uuid": request.network }],
            "metadata": {
                "keycloak_port": request.keycloak_port,
                "requested_by": user_id,
            }
        }
    })
}

pub async fn create_instance(
    client: &reqwest::Client,
    compute_url: &str,
    settings: &ServerSettings,
    request: &InstanceRequest,
    session: &AuthSession,
) -> Result<CreatedInstance, ApiError> {
    let url = join_url(compute_url, "/servers");
    let body = server_create_body(settings, request, &session.user_id);
    let resp = send(
        client,
        Method::POST,
        &url,
        &[(AUTH_TOKEN_HEADER, session.token.as_str())],
        Payload::Json(&body),
    )
    .await?;
    let id = resp
        .body
        .pointer("/server/id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::InvalidResponse("server create response has no id".into()))?
        .to_string();
    tracing::info!(server_id = %id, flavor = %request.flavor, "Keycloak instance accepted by Nova");
    Ok(CreatedInstance {
        id,
        token: session.token.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_body_maps_request_fields() {
        let settings = ServerSettings {
            name: "keycloak-server".into(),
            image_id: "img-1".into(),
        };
        let request = InstanceRequest {
            flavor: "1".into(),
            keypair: "k1".into(),
            network: "n1".into(),
            keycloak_port: "8080".into(),
        };
        let body = server_create_body(&settings, &request, "u-1");
        assert_eq!(body.pointer("/server/flavorRef"), Some(&json!("1")));
        assert_eq!(body.pointer("/server/key_name"), Some(&json!("k1")));
        assert_eq!(body.pointer("/server/networks/0/uuid"), Some(&json!("n1")));
        assert_eq!(body.pointer("/server/metadata/keycloak_port"), Some(&json!("8080")));
        assert_eq!(body.pointer("/server/metadata/requested_by"), Some(&json!("u-1")));
        assert_eq!(body.pointer("/server/imageRef"), Some(&json!("img-1")));
    }
}
