use serde::{Deserialize, Serialize};

use super::auth::AuthToken;

/// Everything the configure-instance step collects, in the shape the
/// creation endpoint accepts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRequest {
    pub flavor: String,
    pub keypair: String,
    pub network: String,
    pub keycloak_port: String,
}

/// Server name and image used for every Keycloak instance.
#[derive(Clone, Debug, Default)]
pub struct ServerSettings {
    pub name: String,
    pub image_id: String,
}

/// A Nova server accepted for creation.
#[derive(Clone, Debug, Serialize)]
pub struct CreatedInstance {
    pub id: String,
    #[serde(skip_serializing)]
    pub token: AuthToken,
}
