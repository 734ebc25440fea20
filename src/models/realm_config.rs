use serde::{Deserialize, Serialize};

/// Realm-level switches collected on the realm settings form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RealmSettings {
    pub realm: String,
    pub display_name: String,
    pub enabled: bool,
    /// `none`, `external` or `all`
    pub ssl_required: String,
    pub registration_allowed: bool,
    pub login_with_email_allowed: bool,
    pub reset_password_allowed: bool,
    pub remember_me: bool,
    pub verify_email: bool,
}

impl Default for RealmSettings {
    fn default() -> Self {
        Self {
            realm: "keycloak".to_string(),
            display_name: String::new(),
            enabled: true,
            ssl_required: "external".to_string(),
            registration_allowed: false,
            login_with_email_allowed: true,
            reset_password_allowed: false,
            remember_me: false,
            verify_email: false,
        }
    }
}

/// The single client the console configures inside the realm.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    pub client_id: String,
    pub name: String,
    pub protocol: String,
    pub public_client: bool,
    pub root_url: String,
    pub redirect_uris: Vec<String>,
    pub web_origins: Vec<String>,
    pub standard_flow_enabled: bool,
    pub direct_access_grants_enabled: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: "console".to_string(),
            name: String::new(),
            protocol: "openid-connect".to_string(),
            public_client: true,
            root_url: String::new(),
            redirect_uris: vec![],
            web_origins: vec![],
            standard_flow_enabled: true,
            direct_access_grants_enabled: false,
        }
    }
}

/// Token and session lifetimes, all in seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenLifespans {
    pub access_token_lifespan: u32,
    pub access_code_lifespan: u32,
    pub sso_session_idle_timeout: u32,
    pub sso_session_max_lifespan: u32,
    pub offline_session_idle_timeout: u32,
}

impl Default for TokenLifespans {
    fn default() -> Self {
        Self {
            access_token_lifespan: 300,
            access_code_lifespan: 60,
            sso_session_idle_timeout: 1800,
            sso_session_max_lifespan: 36000,
            offline_session_idle_timeout: 2_592_000,
        }
    }
}

/// The three assembler inputs as edited by one console session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDraft {
    pub realm: RealmSettings,
    pub client: ClientConfig,
    pub tokens: TokenLifespans,
}

/// Client entry of the exported realm.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRepresentation {
    pub client_id: String,
    pub name: String,
    pub enabled: bool,
    pub protocol: String,
    pub public_client: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_url: Option<String>,
    pub redirect_uris: Vec<String>,
    pub web_origins: Vec<String>,
    pub standard_flow_enabled: bool,
    pub direct_access_grants_enabled: bool,
}

/// Realm document in Keycloak's import/export layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    pub realm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub enabled: bool,
    pub ssl_required: String,
    pub registration_allowed: bool,
    pub login_with_email_allowed: bool,
    pub reset_password_allowed: bool,
    pub remember_me: bool,
    pub verify_email: bool,
    pub access_token_lifespan: u32,
    pub access_code_lifespan: u32,
    pub sso_session_idle_timeout: u32,
    pub sso_session_max_lifespan: u32,
    pub offline_session_idle_timeout: u32,
    pub clients: Vec<ClientRepresentation>,
}
