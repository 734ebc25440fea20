use std::env;
use std::path::Path;
use std::time::Duration;

use crate::api::RetryPolicy;
use crate::models::{Credentials, ServerSettings};

// Default configuration constants
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_COMPUTE_URL: &str = "https://dash.cloud.cerist.dz:8774/v2.1";
pub const DEFAULT_IDENTITY_URL: &str = "https://dash.cloud.cerist.dz:5000/v3";
pub const DEFAULT_USER_DOMAIN: &str = "Default";
pub const DEFAULT_INSTANCE_NAME: &str = "keycloak-server";
pub const DEFAULT_KEYCLOAK_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_KEYCLOAK_REALM: &str = "master";
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 250;

pub fn load_env_file(env_file: Option<&str>) {
    if let Some(path) = env_file {
        dotenvy::from_path(Path::new(path)).ok();
    } else {
        dotenvy::dotenv().ok();
    }
}

pub fn get_compute_url() -> String {
    sanitize_base_url(
        &env::var("OPENSTACK_COMPUTE_URL").unwrap_or_else(|_| DEFAULT_COMPUTE_URL.to_string()),
        DEFAULT_COMPUTE_URL,
    )
}

pub fn get_identity_url() -> String {
    sanitize_base_url(
        &env::var("OPENSTACK_IDENTITY_URL").unwrap_or_else(|_| DEFAULT_IDENTITY_URL.to_string()),
        DEFAULT_IDENTITY_URL,
    )
}

pub fn get_keycloak_base_url() -> String {
    sanitize_base_url(
        &env::var("KEYCLOAK_BASE_URL").unwrap_or_else(|_| DEFAULT_KEYCLOAK_BASE_URL.to_string()),
        DEFAULT_KEYCLOAK_BASE_URL,
    )
}

pub fn get_keycloak_realm() -> String {
    non_empty_var("KEYCLOAK_REALM").unwrap_or_else(|| DEFAULT_KEYCLOAK_REALM.to_string())
}

/// Keycloak admin credentials used by the CLI to obtain an admin token.
pub fn get_keycloak_admin() -> Option<(String, String)> {
    let username = non_empty_var("KEYCLOAK_ADMIN_USERNAME")?;
    let password = non_empty_var("KEYCLOAK_ADMIN_PASSWORD")?;
    Some((username, password))
}

/// OpenStack password credentials from the environment, if a username and
/// password are both configured.
pub fn get_default_credentials() -> Option<Credentials> {
    let username = non_empty_var("OPENSTACK_USERNAME")?;
    let password = non_empty_var("OPENSTACK_PASSWORD")?;
    Some(Credentials {
        username,
        password,
        user_domain: non_empty_var("OPENSTACK_USER_DOMAIN")
            .unwrap_or_else(|| DEFAULT_USER_DOMAIN.to_string()),
        project_id: non_empty_var("OPENSTACK_PROJECT_ID"),
    })
}

pub fn get_server_settings() -> ServerSettings {
    ServerSettings {
        name: non_empty_var("KEYCLOAK_INSTANCE_NAME")
            .unwrap_or_else(|| DEFAULT_INSTANCE_NAME.to_string()),
        image_id: non_empty_var("OPENSTACK_IMAGE_ID").unwrap_or_default(),
    }
}

pub fn get_retry_policy() -> RetryPolicy {
    let max_attempts = non_empty_var("RETRY_MAX_ATTEMPTS")
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_RETRY_MAX_ATTEMPTS);
    let base_delay_ms = non_empty_var("RETRY_BASE_DELAY_MS")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_BASE_DELAY_MS);
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(base_delay_ms),
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn sanitize_base_url(raw: &str, fallback: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}
