use serde::Deserialize;

use crate::error::{ApiError, FieldError};
use crate::models::InstanceRequest;

pub const DEFAULT_KEYCLOAK_PORT: &str = "8080";

/// Configure-instance form as submitted by the user.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerInstanceForm {
    pub flavor: String,
    pub keypair: String,
    pub network: String,
    #[serde(alias = "keycloakPort")]
    pub port: String,
}

impl Default for ServerInstanceForm {
    fn default() -> Self {
        Self {
            flavor: String::new(),
            keypair: String::new(),
            network: String::new(),
            port: DEFAULT_KEYCLOAK_PORT.to_string(),
        }
    }
}

impl ServerInstanceForm {
    /// Every field must be a non-empty string. All failures are reported
    /// together so the form can mark each field.
    pub fn validate(&self) -> Result<InstanceRequest, ApiError> {
        let fields = [
            ("flavor", &self.flavor),
            ("keypair", &self.keypair),
            ("network", &self.network),
            ("port", &self.port),
        ];
        let errors: Vec<FieldError> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| FieldError::new(name, "must not be empty"))
            .collect();
        if !errors.is_empty() {
            return Err(ApiError::ValidationFailed(errors));
        }
        Ok(InstanceRequest {
            flavor: self.flavor.trim().to_string(),
            keypair: self.keypair.trim().to_string(),
            network: self.network.trim().to_string(),
            keycloak_port: self.port.trim().to_string(),
        })
    }
}
