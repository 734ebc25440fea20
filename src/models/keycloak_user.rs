use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Keycloak `UserRepresentation`, restricted to the fields the console edits.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Vec<String>>,
}

/// Fields an update may carry. Absent fields keep the stored value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub enabled: Option<bool>,
    pub email_verified: Option<bool>,
    pub attributes: Option<BTreeMap<String, Vec<String>>>,
}

impl KeycloakUser {
    /// Overlay the fields present in `patch`.
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(username) = patch.username {
            self.username = username;
        }
        if patch.email.is_some() {
            self.email = patch.email;
        }
        if patch.first_name.is_some() {
            self.first_name = patch.first_name;
        }
        if patch.last_name.is_some() {
            self.last_name = patch.last_name;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(verified) = patch.email_verified {
            self.email_verified = verified;
        }
        if let Some(attributes) = patch.attributes {
            self.attributes = attributes;
        }
    }

    pub fn email_matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.email
            .as_deref()
            .map(|e| e.to_lowercase().contains(&needle))
            .unwrap_or(false)
    }
}
