//! Builds the downloadable Keycloak realm document.
use std::path::{Path, PathBuf};

use crate::models::{ClientConfig, ClientRepresentation, ConfigDocument, RealmSettings, TokenLifespans};

pub const EXPORT_FILE_NAME: &str = "keycloak-config.json";

fn trimmed_unique(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for v in values {
        let t = v.trim();
        if !t.is_empty() && !out.iter().any(|seen| seen == t) {
            out.push(t.to_string());
        }
    }
    out
}

fn non_empty(value: &str) -> Option<String> {
    let t = value.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

fn client_representation(client: &ClientConfig) -> ClientRepresentation {
    let client_id = client.client_id.trim().to_string();
    ClientRepresentation {
        name: non_empty(&client.name).unwrap_or_else(|| client_id.clone()),
        client_id,
        enabled: true,
        protocol: non_empty(&client.protocol).unwrap_or_else(|| "openid-connect".to_string()),
        public_client: client.public_client,
        root_url: non_empty(&client.root_url),
        redirect_uris: trimmed_unique(&client.redirect_uris),
        web_origins: trimmed_unique(&client.web_origins),
        standard_flow_enabled: client.standard_flow_enabled,
        direct_access_grants_enabled: client.direct_access_grants_enabled,
    }
}

/// Merge the three configuration sections into one realm document.
///
/// Pure and deterministic: the same inputs always give an equal document,
/// and URI lists keep their first-seen order.
pub fn assemble(realm: &RealmSettings, client: &ClientConfig, tokens: &TokenLifespans) -> ConfigDocument {
    ConfigDocument {
        realm: realm.realm.trim().to_string(),
        display_name: non_empty(&realm.display_name),
        enabled: realm.enabled,
        ssl_required: non_empty(&realm.ssl_required).unwrap_or_else(|| "external".to_string()),
        registration_allowed: realm.registration_allowed,
        login_with_email_allowed: realm.login_with_email_allowed,
        reset_password_allowed: realm.reset_password_allowed,
        remember_me: realm.remember_me,
        verify_email: realm.verify_email,
        access_token_lifespan: tokens.access_token_lifespan,
        access_code_lifespan: tokens.access_code_lifespan,
        sso_session_idle_timeout: tokens.sso_session_idle_timeout,
        sso_session_max_lifespan: tokens.sso_session_max_lifespan,
        offline_session_idle_timeout: tokens.offline_session_idle_timeout,
        clients: vec![client_representation(client)],
    }
}

/// Pretty JSON, two-space indented.
pub fn to_export_json(document: &ConfigDocument) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(document)
}

/// Write the export. A directory target receives `keycloak-config.json`.
pub fn write_export(document: &ConfigDocument, target: &Path) -> std::io::Result<PathBuf> {
    let path = if target.is_dir() {
        target.join(EXPORT_FILE_NAME)
    } else {
        target.to_path_buf()
    };
    let json = to_export_json(document).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(&path, json)?;
    tracing::info!(path = %path.display(), realm = %document.realm, "Wrote Keycloak configuration");
    Ok(path)
}
